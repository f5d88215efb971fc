//! Parameter modifier flags.
//!
//! Legal multisets: `{}`, `{$}`, `{&}`, `{@}`, `{?}`, each optionally
//! combined with `{!}`. Anything else is rejected at comment-parse time.

/// The modifier flags present on one parameter site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Modifiers {
    /// `$`: a negative value removes the owning condition.
    pub dollar: bool,
    /// `&`: removal rule of `$`, but the site never binds.
    pub amp: bool,
    /// `@`: the value is required and must be positive.
    pub at: bool,
    /// `?`: fallback chain member.
    pub question: bool,
    /// `!`: polarity negation.
    pub bang: bool,
}

impl Modifiers {
    /// Consumes modifier characters from the head of `rest`, returning the
    /// flags and the remainder. `None` means an illegal combination.
    pub fn take(rest: &str) -> Option<(Self, &str)> {
        let mut mods = Self::default();
        let mut rest = rest;
        while let Some(c) = rest.chars().next() {
            let flag = match c {
                '$' => &mut mods.dollar,
                '&' => &mut mods.amp,
                '@' => &mut mods.at,
                '?' => &mut mods.question,
                '!' => &mut mods.bang,
                _ => break,
            };
            if *flag {
                return None;
            }
            *flag = true;
            rest = &rest[c.len_utf8()..];
        }
        mods.validate().then_some((mods, rest))
    }

    /// Returns true when the combination is legal.
    fn validate(self) -> bool {
        let exclusive =
            usize::from(self.dollar) + usize::from(self.amp) + usize::from(self.at);
        exclusive <= 1 && !(self.question && exclusive > 0)
    }

    /// Returns true when no flag at all is set.
    pub fn is_empty(self) -> bool {
        self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_modifiers_parse() {
        for prefix in ["$", "&", "@", "?", "!", ""] {
            let s = format!("{prefix}name");
            let (_, rest) = Modifiers::take(&s).unwrap();
            assert_eq!(rest, "name");
        }
    }

    #[test]
    fn bang_combines_with_anything() {
        let (m, _) = Modifiers::take("$!name").unwrap();
        assert!(m.dollar && m.bang);
        let (m, _) = Modifiers::take("!&name").unwrap();
        assert!(m.amp && m.bang);
    }

    #[test]
    fn duplicates_are_illegal() {
        assert!(Modifiers::take("$$name").is_none());
        assert!(Modifiers::take("!!name").is_none());
    }

    #[test]
    fn conflicting_sets_are_illegal() {
        assert!(Modifiers::take("$&name").is_none());
        assert!(Modifiers::take("@$name").is_none());
        assert!(Modifiers::take("?$name").is_none());
        assert!(Modifiers::take("&@name").is_none());
    }
}
