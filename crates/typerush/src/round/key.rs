/// Keyboard input as the machines see it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    /// Submit if complete
    Enter,
    /// Skip the round or line
    Escape,
    /// Context dependent: start, skip intro, advance line, restart, or a typed space
    Space,
    HardReset,
}

impl Key {
    /// Map a typed character, treating `' '` as [`Key::Space`].
    pub fn from_char(c: char) -> Self {
        if c == ' ' { Self::Space } else { Self::Char(c) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_char() {
        assert_eq!(Key::from_char(' '), Key::Space);
        assert_eq!(Key::from_char('k'), Key::Char('k'));
    }
}
