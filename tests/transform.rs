use classpatch::access_flags::AccessFlags;
use classpatch::annotations::{Annotation, AnnotationExpr, AnnotationValue};
use classpatch::class_path::{SearchPath, SourceType};
use classpatch::descriptors::BaseType;
use classpatch::fragments::*;
use classpatch::method::MethodDescriptor;
use classpatch::opcodes::{Instruction, StorageClass};
use classpatch::resolution::{Import, ResolutionContext, ResolutionSettings, TypeParameter};
use classpatch::types::Type;
use classpatch::{Error, Result};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn search_path() -> SearchPath {
    let mut search_path = SearchPath::with_java_library();
    search_path.add_source_types(
        "src/me/alec/Callbacks.java",
        "me.alec",
        &[SourceType::new("Callbacks").with_nested(SourceType::new("Cache"))],
    );
    search_path.add_entry("me/alec/Target.class");
    search_path
}

fn patch_context(class_path: &SearchPath) -> ResolutionContext<'_> {
    ResolutionContext::new(
        "me.alec",
        vec![Import::parse("java.util.*"), Import::parse("me.alec.Callbacks")],
        vec![TypeParameter::bounded("K", "Comparable<K>")],
        class_path,
        ResolutionSettings::default(),
    )
}

/// Body of `Object lookup(List<K> keys, int idx) { log(); return keys.get(idx); }`
fn target_body(ctx: &ResolutionContext<'_>) -> Result<CodeFragment> {
    let keys = ctx.resolve("List<K>")?;
    let int = ctx.resolve("int")?;
    let object = ctx.resolve("Object")?;
    let target = ctx.resolve("Target")?;

    let log = CodeFragment::method_call(target, "log", vec![], vec![]);
    let load_keys = CodeFragment::code(
        vec![
            Instruction::load(&keys, 1)?,
            Instruction::load(&int, 2)?,
        ],
        vec![],
        vec![
            IntermediateValue::stack(keys.clone(), 0),
            IntermediateValue::stack(int.clone(), 1),
        ],
    );
    let get = CodeFragment::method_call(
        keys.clone(),
        "get",
        vec![
            IntermediateValue::stack(keys, 0),
            IntermediateValue::stack(int, 1),
        ],
        vec![IntermediateValue::stack(object.clone(), 0)],
    );
    let ret = CodeFragment::return_value(Some(IntermediateValue::stack(object, 0)));
    Ok(CodeFragment::body(vec![log, load_keys, get, ret], vec![], vec![]))
}

/// Callback taking the call's receiver and argument in locals 3 and 4
fn callback(ctx: &ResolutionContext<'_>) -> Result<CodeFragment> {
    let keys = ctx.resolve("List<K>")?;
    let int = ctx.resolve("int")?;
    let object = ctx.resolve("Object")?;
    let cache = ctx.resolve("Callbacks.Cache")?;

    let inputs = vec![
        IntermediateValue::local(keys, 3),
        IntermediateValue::local(int, 4),
    ];
    let lookup = CodeFragment::method_call(
        cache,
        "lookup",
        inputs.clone(),
        vec![IntermediateValue::stack(object.clone(), 0)],
    );
    let ret = CodeFragment::return_value(Some(IntermediateValue::stack(object, 0)));
    Ok(CodeFragment::body(vec![lookup, ret], inputs, vec![]))
}

#[test]
fn resolve_patch_names() -> Result<()> {
    init_logging();
    let class_path = search_path();
    let ctx = patch_context(&class_path);

    let cache = ctx.resolve("Callbacks.Cache")?;
    assert_eq!(cache.descriptor(), "Lme/alec/Callbacks$Cache;");
    assert_eq!(ctx.unresolve(&cache), "Callbacks.Cache");

    let key = ctx.resolve("K")?;
    assert_eq!(key.descriptor(), "Ljava/lang/Comparable;");
    assert_eq!(key.signature(), Some("TK;"));

    let map = ctx.resolve("Map<String, List<K>>")?;
    assert_eq!(map.descriptor(), "Ljava/util/Map;");
    assert_eq!(ctx.unresolve(&map), "Map<String, List<K>>");

    match ctx.resolve("Unknown") {
        Err(Error::AmbiguousDefaultPackageName(name)) => assert_eq!(name, "Unknown"),
        other => panic!("expected an ambiguous name, got {:?}", other),
    }
    Ok(())
}

#[test]
fn overwrite_calls_with_callback() -> Result<()> {
    init_logging();
    let class_path = search_path();
    let ctx = patch_context(&class_path);
    let mut body = target_body(&ctx)?;
    let before = body.execution_outcome();

    let callback = callback(&ctx)?;
    let mut replaced = 0;
    body.for_each_fragment_mut(FragmentVariant::MethodCall, &mut |call| {
        if call.name() != Some("get") {
            return Ok(());
        }
        replaced += 1;
        call.insert(
            callback.clone(),
            InsertionPosition::Overwrite,
            InsertionOptions::default(),
        )
    })?;
    assert_eq!(replaced, 1);

    // Still reaches the original return, through the converted one
    assert_eq!(body.execution_outcome(), before);
    assert_eq!(body.find_fragments(FragmentVariant::Return).len(), 1);
    assert_eq!(body.find_fragments(FragmentVariant::Yield).len(), 1);

    let replaced_call = &body.children()[2];
    assert_eq!(replaced_call.inputs().len(), 2);
    match replaced_call.children()[0].kind() {
        FragmentKind::Code { instructions, .. } => assert_eq!(
            instructions,
            &[
                Instruction::Store(StorageClass::Int, 4),
                Instruction::Store(StorageClass::Reference, 3),
            ]
        ),
        other => panic!("expected input binding, got {:?}", other),
    }
    Ok(())
}

#[test]
fn abort_early_before_body() -> Result<()> {
    init_logging();
    let class_path = search_path();
    let ctx = patch_context(&class_path);
    let mut body = target_body(&ctx)?;

    // `if (Callbacks.disabled()) return null;`
    let guard = CodeFragment::body(
        vec![
            CodeFragment::method_call(
                ctx.resolve("Callbacks")?,
                "disabled",
                vec![],
                vec![IntermediateValue::stack(Type::primitive(BaseType::Boolean), 0)],
            ),
            CodeFragment::code_with_outcome(
                vec![Instruction::AConstNull, Instruction::Return(Some(StorageClass::Reference))],
                ExecutionOutcome::new(true, false, true),
                vec![IntermediateValue::stack(Type::primitive(BaseType::Boolean), 0)],
                vec![],
            ),
        ],
        vec![],
        vec![],
    );
    body.insert(guard, InsertionPosition::Before, InsertionOptions::default())?;
    assert_eq!(body.children().len(), 5);
    assert_eq!(
        body.execution_outcome(),
        ExecutionOutcome::new(false, true, true)
    );

    // Nothing can follow the final return
    let trailer = CodeFragment::method_call(ctx.resolve("Target")?, "log", vec![], vec![]);
    let unchanged = body.clone();
    match body.insert(trailer, InsertionPosition::After, InsertionOptions::default()) {
        Err(Error::ReachabilityConflict { position, reason, .. }) => {
            assert_eq!(position, InsertionPosition::After);
            assert_eq!(reason, ConflictReason::Unreachable);
        }
        other => panic!("expected a conflict, got {:?}", other),
    }
    assert_eq!(body, unchanged);
    Ok(())
}

#[test]
fn method_metadata() -> Result<()> {
    init_logging();
    let class_path = search_path();
    let ctx = patch_context(&class_path);

    let descriptor = MethodDescriptor::parse(
        "(Ljava/util/List;I)Ljava/lang/Object;",
        Some("<K::Ljava/lang/Comparable<TK;>;>(Ljava/util/List<TK;>;I)Ljava/lang/Object;"),
    )?;
    assert_eq!(descriptor.parameters()[0], ctx.resolve("List<K>")?);
    assert_eq!(descriptor.return_type(), &ctx.resolve("Object")?);

    let flags: AccessFlags = "private static".parse()?;
    assert_eq!(flags.make_access(true).to_string(), "public static");

    let evaluate = |value: &i32, _: &ResolutionContext<'_>| -> Result<AnnotationValue> {
        Ok(AnnotationValue::Int(*value))
    };
    let annotation = Annotation::from_source(
        &AnnotationExpr::SingleMember {
            name: String::from("Callbacks"),
            value: 3,
        },
        &ctx,
        &evaluate,
    )?;
    assert_eq!(annotation.annotation_type(), &ctx.resolve("Callbacks")?);
    assert_eq!(annotation.get("value"), Some(&AnnotationValue::Int(3)));
    Ok(())
}
