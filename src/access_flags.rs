use crate::binary_format::Serialize;
use crate::errors::Error;
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::fmt;
use std::io::Result;
use std::str::FromStr;

bitflags! {
    /// Visibility and modifier flags shared by classes, methods, and fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNTHETIC = 0x1000;
    }
}

impl AccessFlags {
    /// Flags with a source-level keyword, in the order they are rendered
    const KEYWORDS: [(AccessFlags, &'static str); 5] = [
        (AccessFlags::PUBLIC, "public"),
        (AccessFlags::PRIVATE, "private"),
        (AccessFlags::PROTECTED, "protected"),
        (AccessFlags::STATIC, "static"),
        (AccessFlags::FINAL, "final"),
    ];

    const VISIBILITY: AccessFlags = AccessFlags::from_bits_truncate(
        AccessFlags::PUBLIC.bits() | AccessFlags::PRIVATE.bits() | AccessFlags::PROTECTED.bits(),
    );

    pub fn has_flag(self, flag: AccessFlags) -> bool {
        self.contains(flag)
    }

    /// Copy with `old` swapped for `new`, or unchanged if `old` isn't set
    pub fn replace_flag(self, old: AccessFlags, new: AccessFlags) -> AccessFlags {
        if self.contains(old) {
            (self - old) | new
        } else {
            self
        }
    }

    /// Widen visibility so the member is visible to subclasses
    ///
    /// Public and protected are left alone and private becomes protected. Package-private goes
    /// straight to public, since protected would not be a widening for same-package callers.
    pub fn make_at_least_protected(self) -> AccessFlags {
        if self.intersects(AccessFlags::PUBLIC | AccessFlags::PROTECTED) {
            self
        } else if self.contains(AccessFlags::PRIVATE) {
            self.replace_flag(AccessFlags::PRIVATE, AccessFlags::PROTECTED)
        } else {
            self | AccessFlags::PUBLIC
        }
    }

    /// [`make_at_least_protected`](AccessFlags::make_at_least_protected), then optionally promote
    /// protected to public
    pub fn make_access(self, make_public: bool) -> AccessFlags {
        let flags = self.make_at_least_protected();
        if make_public && flags.contains(AccessFlags::PROTECTED) {
            flags.replace_flag(AccessFlags::PROTECTED, AccessFlags::PUBLIC)
        } else {
            flags
        }
    }

    pub fn is_package_private(self) -> bool {
        !self.intersects(AccessFlags::VISIBILITY)
    }
}

/// Space separated keywords in canonical order (`public static final`)
///
/// `synthetic` has no source keyword and is not rendered.
impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, keyword) in AccessFlags::KEYWORDS {
            if self.contains(flag) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(keyword)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FromStr for AccessFlags {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<AccessFlags, Error> {
        let mut flags = AccessFlags::empty();
        for token in s.split_whitespace() {
            let flag = match token {
                "synthetic" => AccessFlags::SYNTHETIC,
                _ => AccessFlags::KEYWORDS
                    .iter()
                    .find(|(_, keyword)| *keyword == token)
                    .map(|(flag, _)| *flag)
                    .ok_or_else(|| Error::InvalidAccessFlag(token.to_owned()))?,
            };
            flags |= flag;
        }
        Ok(flags)
    }
}

impl Serialize for AccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binary_format::to_bytes;

    fn parse(s: &str) -> AccessFlags {
        s.parse().unwrap()
    }

    #[test]
    fn canonical_rendering() {
        assert_eq!(parse("final static public").to_string(), "public static final");
        assert_eq!(parse("protected final").to_string(), "protected final");
        assert_eq!(parse("synthetic private").to_string(), "private");
        assert_eq!(AccessFlags::empty().to_string(), "");
    }

    #[test]
    fn unknown_tokens_rejected() {
        match "public volatile".parse::<AccessFlags>() {
            Err(Error::InvalidAccessFlag(token)) => assert_eq!(token, "volatile"),
            other => panic!("expected invalid access flag, got {:?}", other),
        }
    }

    #[test]
    fn widening_chain() {
        let flags = parse("private");
        assert_eq!(flags.to_string(), "private");
        let flags = flags.make_at_least_protected();
        assert_eq!(flags.to_string(), "protected");
        let flags = flags.make_access(true);
        assert_eq!(flags.to_string(), "public");
    }

    #[test]
    fn package_private_goes_public() {
        let flags = parse("static");
        assert!(flags.is_package_private());
        assert_eq!(flags.make_at_least_protected().to_string(), "public static");
        assert_eq!(parse("protected").make_access(false).to_string(), "protected");
    }

    #[test]
    fn make_at_least_protected_is_idempotent() {
        for text in ["", "public", "private static", "protected final", "final"] {
            let once = parse(text).make_at_least_protected();
            assert_eq!(once.make_at_least_protected(), once, "'{}'", text);
        }
    }

    #[test]
    fn replace_and_query() {
        let flags = parse("public final").replace_flag(AccessFlags::FINAL, AccessFlags::STATIC);
        assert!(flags.has_flag(AccessFlags::STATIC));
        assert!(!flags.has_flag(AccessFlags::FINAL));

        // Nothing to replace
        let flags = parse("public").replace_flag(AccessFlags::FINAL, AccessFlags::STATIC);
        assert_eq!(flags, AccessFlags::PUBLIC);
    }

    #[test]
    fn serialized_bits() {
        let flags = parse("public static synthetic");
        assert_eq!(to_bytes(&flags).unwrap(), vec![0x10, 0x09]);
    }
}
