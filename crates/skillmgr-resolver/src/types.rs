#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Index of the single matching identity.
    Unique(usize),
    /// Indices of the closely matching identities, best match first.
    Ambiguous(Vec<usize>),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disambiguation<T> {
    One(T),
    Prompt(Vec<T>),
    TooMany(usize),
    NoneLeft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scored {
    pub index: usize,
    pub score: f64,
}
