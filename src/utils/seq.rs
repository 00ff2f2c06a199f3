/// A one-bit alternating sequence number.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Seq {
    n: u16,
}

impl Seq {
    pub const ZERO: Seq = Seq { n: 0 };
    pub const ONE: Seq = Seq { n: 1 };

    #[inline]
    fn check_rep(&self) {
        assert!(self.n <= 1);
    }

    /// Returns `None` for anything but `0` and `1`.
    pub fn from_u16(n: u16) -> Option<Self> {
        match n {
            0 => Some(Seq::ZERO),
            1 => Some(Seq::ONE),
            _ => None,
        }
    }

    pub fn to_u16(&self) -> u16 {
        self.n
    }

    #[must_use]
    pub fn next(&self) -> Seq {
        let next = Seq { n: 1 - self.n };
        next.check_rep();
        next
    }

    pub fn flip(&mut self) {
        *self = self.next();
    }
}

impl Default for Seq {
    fn default() -> Self {
        Seq::ZERO
    }
}

impl std::fmt::Display for Seq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::Seq;

    #[test]
    fn flip_alternates() {
        let mut a = Seq::default();
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(a.to_u16());
            a.flip();
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn from_u16() {
        assert_eq!(Seq::from_u16(0), Some(Seq::ZERO));
        assert_eq!(Seq::from_u16(1), Some(Seq::ONE));
        assert_eq!(Seq::from_u16(2), None);
        assert_eq!(Seq::from_u16(u16::MAX), None);
    }

    #[test]
    fn next_is_pure() {
        let a = Seq::ONE;
        assert_eq!(a.next(), Seq::ZERO);
        assert_eq!(a, Seq::ONE);
    }
}
