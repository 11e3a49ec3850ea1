//! Position mapping through document changes.

/// Which side of a change a boundary position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay before content inserted at the position
    Left,
    /// Move after content inserted at the position
    Right,
}

/// Position map of a single step: `old_size` positions starting at `start`
/// were replaced by `new_size` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepMap {
    range: Option<(usize, usize, usize)>,
}

impl StepMap {
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            range: Some((start, old_size, new_size)),
        }
    }

    /// Map that leaves every position in place
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        let Some((start, old_size, new_size)) = self.range else {
            return pos;
        };
        let end = start + old_size;
        if pos < start {
            return pos;
        }
        if pos > end {
            return pos - old_size + new_size;
        }
        let side = if old_size == 0 {
            bias
        } else if pos == start {
            Bias::Left
        } else if pos == end {
            Bias::Right
        } else {
            bias
        };
        match side {
            Bias::Left => start,
            Bias::Right => start + new_size,
        }
    }

    /// Whether `from..to` lies entirely inside the replaced range
    pub fn deletes(&self, from: usize, to: usize) -> bool {
        match self.range {
            Some((start, old_size, _)) => old_size > 0 && from >= start && to <= start + old_size,
            None => false,
        }
    }
}

/// Composition of step maps, applied in order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Mapping made of the maps from index `from` onward
    pub fn slice(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps.get(from..).map(<[StepMap]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn map(&self, pos: usize, bias: Bias) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, bias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_respects_bias() {
        let map = StepMap::new(5, 0, 3);
        assert_eq!(map.map(4, Bias::Right), 4);
        assert_eq!(map.map(5, Bias::Left), 5);
        assert_eq!(map.map(5, Bias::Right), 8);
        assert_eq!(map.map(6, Bias::Left), 9);
    }

    #[test]
    fn test_deletion_collapses_range() {
        let map = StepMap::new(2, 4, 0);
        assert_eq!(map.map(2, Bias::Right), 2);
        assert_eq!(map.map(4, Bias::Right), 2);
        assert_eq!(map.map(6, Bias::Left), 2);
        assert_eq!(map.map(10, Bias::Left), 6);
        assert!(map.deletes(3, 4));
        assert!(!map.deletes(1, 3));
    }

    #[test]
    fn test_replacement_boundaries() {
        let map = StepMap::new(2, 2, 5);
        assert_eq!(map.map(2, Bias::Right), 2);
        assert_eq!(map.map(4, Bias::Left), 7);
        assert_eq!(map.map(3, Bias::Left), 2);
        assert_eq!(map.map(3, Bias::Right), 7);
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(0, 0, 2));
        mapping.push(StepMap::empty());
        mapping.push(StepMap::new(10, 1, 0));
        assert_eq!(mapping.map(5, Bias::Right), 7);
        assert_eq!(mapping.map(12, Bias::Right), 13);
        assert_eq!(mapping.slice(1).map(12, Bias::Right), 11);
        assert_eq!(mapping.slice(5).len(), 0);
    }
}
