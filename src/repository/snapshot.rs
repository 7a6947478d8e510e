/// Read-only view of the repository mirror at one point in time.
///
/// `keys()[i]` and `vector(i)` always describe the same record.
#[derive(Debug, Clone, Copy)]
pub struct RepositorySnapshot<'a> {
    keys: &'a [String],
    arena: &'a [f32],
    dim: usize,
}

impl<'a> RepositorySnapshot<'a> {
    pub(crate) fn new(keys: &'a [String], arena: &'a [f32], dim: usize) -> Self {
        Self { keys, arena, dim }
    }

    pub fn keys(&self) -> &'a [String] {
        self.keys
    }

    /// Feature length shared by every vector (0 while nothing has been stored).
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Vector stored in slot `index`.
    pub fn vector(&self, index: usize) -> Option<&'a [f32]> {
        if index >= self.keys.len() {
            return None;
        }
        let start = index * self.dim;
        self.arena.get(start..start + self.dim)
    }

    /// Vectors in slot order.
    pub fn vectors(self) -> impl Iterator<Item = &'a [f32]> {
        self.arena.chunks_exact(self.dim.max(1)).take(self.keys.len())
    }

    /// `(key, vector)` pairs in slot order.
    pub fn iter(self) -> impl Iterator<Item = (&'a str, &'a [f32])> {
        self.keys.iter().map(String::as_str).zip(self.vectors())
    }
}
