//! Type matcher: how far an argument is from a parameter
//!
//! Distances are small non-negative integers, `Some(0)` meaning an exact
//! match and `None` meaning the argument cannot be passed at all.
//!
//! | parameter \ argument | byte | short | int | long | float | double |
//! |----------------------|------|-------|-----|------|-------|--------|
//! | byte                 | 0    | 1     | 2   | 3    | 4     | 5      |
//! | short                | 1    | 0     | 1   | 2    | 3     | 4      |
//! | int                  | 2    | 1     | 0   | 1    | 2     | 3      |
//! | long                 | 3    | 2     | 1   | 0    | 1     | 2      |
//! | float                | 4    | 3     | 2   | 1    | 0     | 1      |
//! | double               | 5    | 4     | 3   | 2    | 1     | 0      |
//!
//! Boolean and char parameters only match their own kind (boxed or not).
//! Reference parameters cost [`HOP_COST`] per supertype edge.

use dashmap::DashMap;
use hyperbridge_types::{NativeValue, PrimitiveKind, TypeId, TypeRegistry};

/// Distance of an exact match
pub const EXACT: u32 = 0;

/// Cost of one supertype edge between reference types
pub const HOP_COST: u32 = 100;

const WIDENING: [[u32; 6]; 6] = [
    [0, 1, 2, 3, 4, 5],
    [1, 0, 1, 2, 3, 4],
    [2, 1, 0, 1, 2, 3],
    [3, 2, 1, 0, 1, 2],
    [4, 3, 2, 1, 0, 1],
    [5, 4, 3, 2, 1, 0],
];

/// Distance between two primitive kinds, parameter first
pub fn primitive_distance(parameter: PrimitiveKind, argument: PrimitiveKind) -> Option<u32> {
    match (parameter, argument) {
        (PrimitiveKind::Boolean, PrimitiveKind::Boolean) => Some(EXACT),
        (PrimitiveKind::Char, PrimitiveKind::Char) => Some(EXACT),
        _ => {
            let row = parameter.numeric_rank()?;
            let column = argument.numeric_rank()?;
            Some(WIDENING[row][column])
        }
    }
}

/// Computes (and optionally memoizes) argument distances
#[derive(Debug, Default)]
pub struct TypeMatcher {
    memo: Option<DashMap<(TypeId, TypeId), Option<u32>>>,
}

impl TypeMatcher {
    /// Create a matcher, memoizing per (parameter, argument) pair if asked
    pub fn new(memoize: bool) -> Self {
        Self {
            memo: memoize.then(DashMap::new),
        }
    }

    /// Distance from an argument of runtime type `argument` to `parameter`
    pub fn distance(&self, registry: &TypeRegistry, parameter: TypeId, argument: TypeId) -> Option<u32> {
        if parameter == argument {
            return Some(EXACT);
        }
        if let Some(memo) = &self.memo {
            if let Some(hit) = memo.get(&(parameter, argument)) {
                return *hit;
            }
            let distance = self.compute(registry, parameter, argument);
            memo.insert((parameter, argument), distance);
            return distance;
        }
        self.compute(registry, parameter, argument)
    }

    fn compute(&self, registry: &TypeRegistry, parameter: TypeId, argument: TypeId) -> Option<u32> {
        let target = registry.get(parameter)?;
        if let Some(kind) = target.primitive_kind() {
            return primitive_distance(kind, registry.unboxed_kind(argument)?);
        }
        registry
            .hierarchy_hops(argument, parameter)
            .map(|hops| hops.saturating_mul(HOP_COST))
    }

    /// Distance from a concrete argument value to `parameter`.
    ///
    /// Null matches any reference parameter exactly and no primitive one.
    pub fn match_argument(&self, registry: &TypeRegistry, parameter: TypeId, argument: &NativeValue) -> Option<u32> {
        match registry.runtime_type(argument) {
            Some(actual) => self.distance(registry, parameter, actual),
            None => {
                let target = registry.get(parameter)?;
                if target.is_primitive() {
                    None
                } else {
                    Some(EXACT)
                }
            }
        }
    }

    /// Number of memoized pairs
    pub fn memoized(&self) -> usize {
        self.memo.as_ref().map(DashMap::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbridge_types::TypeBuilder;

    #[test]
    fn test_widening_table_is_symmetric() {
        for (i, row) in WIDENING.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                assert_eq!(*cell, WIDENING[j][i]);
                assert_eq!(*cell == 0, i == j);
            }
        }
    }

    #[test]
    fn test_primitive_distances() {
        use PrimitiveKind::*;
        assert_eq!(primitive_distance(Double, Int), Some(3));
        assert_eq!(primitive_distance(Byte, Double), Some(5));
        assert_eq!(primitive_distance(Boolean, Boolean), Some(0));
        assert_eq!(primitive_distance(Boolean, Int), None);
        assert_eq!(primitive_distance(Int, Boolean), None);
        assert_eq!(primitive_distance(Char, Char), Some(0));
        assert_eq!(primitive_distance(Char, Int), None);
    }

    const NUMERIC: [PrimitiveKind; 6] = [
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    #[test]
    fn test_every_numeric_pair_through_boxed_arguments() {
        // rows are parameters, columns are arguments, both byte..double
        let expected: [[u32; 6]; 6] = [
            [0, 1, 2, 3, 4, 5],
            [1, 0, 1, 2, 3, 4],
            [2, 1, 0, 1, 2, 3],
            [3, 2, 1, 0, 1, 2],
            [4, 3, 2, 1, 0, 1],
            [5, 4, 3, 2, 1, 0],
        ];
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(false);
        for (row, parameter) in NUMERIC.iter().enumerate() {
            for (column, argument) in NUMERIC.iter().enumerate() {
                let boxed = registry.boxed(*argument).unwrap();
                assert_eq!(
                    matcher.distance(&registry, registry.primitive(*parameter), boxed),
                    Some(expected[row][column]),
                    "{:?} <- {:?}",
                    parameter,
                    argument
                );
            }
        }
    }

    #[test]
    fn test_distance_grows_away_from_the_parameter() {
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(false);
        let distance = |parameter: PrimitiveKind, argument: PrimitiveKind| {
            let boxed = registry.boxed(argument).unwrap();
            matcher.distance(&registry, registry.primitive(parameter), boxed).unwrap()
        };
        for (target, parameter) in NUMERIC.iter().enumerate() {
            for step in NUMERIC[target..].windows(2) {
                assert!(distance(*parameter, step[0]) < distance(*parameter, step[1]));
            }
            for step in NUMERIC[..=target].windows(2) {
                assert!(distance(*parameter, step[0]) > distance(*parameter, step[1]));
            }
        }
    }

    #[test]
    fn test_boolean_and_char_match_only_themselves() {
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(false);
        for exact in [PrimitiveKind::Boolean, PrimitiveKind::Char] {
            let parameter = registry.primitive(exact);
            assert_eq!(matcher.distance(&registry, parameter, registry.boxed(exact).unwrap()), Some(0));
            for other in NUMERIC {
                let boxed = registry.boxed(other).unwrap();
                assert_eq!(matcher.distance(&registry, parameter, boxed), None);
                assert_eq!(
                    matcher.distance(&registry, registry.primitive(other), registry.boxed(exact).unwrap()),
                    None
                );
            }
        }
    }

    #[test]
    fn test_boxed_arguments_match_primitive_parameters() {
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(false);
        let int = registry.primitive(PrimitiveKind::Int);
        let long = registry.primitive(PrimitiveKind::Long);
        let integer = registry.boxed(PrimitiveKind::Int).unwrap();
        assert_eq!(matcher.distance(&registry, int, integer), Some(0));
        assert_eq!(matcher.distance(&registry, long, integer), Some(1));
        assert_eq!(matcher.distance(&registry, int, registry.string_type()), None);
    }

    #[test]
    fn test_reference_distance_counts_hops() {
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(true);
        let base = registry.define(TypeBuilder::class("t.Base")).unwrap();
        let child = registry.define(TypeBuilder::class("t.Child").extends(base)).unwrap();
        assert_eq!(matcher.distance(&registry, base, child), Some(100));
        assert_eq!(matcher.distance(&registry, registry.object_type(), child), Some(200));
        assert_eq!(matcher.distance(&registry, child, base), None);
        assert_eq!(matcher.memoized(), 3);
        assert_eq!(matcher.distance(&registry, base, child), Some(100));
        assert_eq!(matcher.memoized(), 3);
    }

    #[test]
    fn test_null_argument() {
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(false);
        let int = registry.primitive(PrimitiveKind::Int);
        assert_eq!(matcher.match_argument(&registry, int, &NativeValue::Null), None);
        assert_eq!(
            matcher.match_argument(&registry, registry.string_type(), &NativeValue::Null),
            Some(0)
        );
    }

    #[test]
    fn test_boxed_integer_to_number_reference() {
        let registry = TypeRegistry::new();
        let matcher = TypeMatcher::new(false);
        assert_eq!(
            matcher.match_argument(&registry, registry.number_type(), &NativeValue::Int(3)),
            Some(100)
        );
        assert_eq!(
            matcher.match_argument(&registry, registry.object_type(), &NativeValue::Int(3)),
            Some(200)
        );
    }
}
