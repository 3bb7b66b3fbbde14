/// Grouping key for draw ops; each pass draws one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Compute,
    Opaque,
    Decal,
    Sky,
    Alpha,
    Editor,
    Ui,
}

impl BucketKind {
    /// Number of buckets.
    pub const COUNT: usize = 7;

    /// All buckets, in index order.
    pub const ALL: [BucketKind; Self::COUNT] = [
        BucketKind::Compute,
        BucketKind::Opaque,
        BucketKind::Decal,
        BucketKind::Sky,
        BucketKind::Alpha,
        BucketKind::Editor,
        BucketKind::Ui,
    ];

    /// Position in [`BucketKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_order() {
        for (i, bucket) in BucketKind::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }
}
