//! Types of the target representation.

/// A type in the target representation. Mirrors the source type grammar with
/// one exception: the target has no dedicated boolean, single-bit conditions
/// are `Int { width: 1 }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A fixed-width integer.
    Int { width: u64 },
    /// A heterogeneous tuple.
    Tuple(Vec<Type>),
    /// A fixed-size array.
    Array { size: u64, element: Box<Type> },
    /// A sequencing token.
    Token,
}

impl Type {
    pub fn int(width: u64) -> Self {
        Type::Int { width }
    }

    pub fn array(size: u64, element: Type) -> Self {
        Type::Array {
            size,
            element: Box::new(element),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int { width } => write!(f, "i{width}"),
            Type::Tuple(elements) => {
                write!(f, "tuple<")?;
                for (i, e) in elements.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ">")
            }
            Type::Array { size, element } => {
                write!(f, "array<{size} x {element}>")
            }
            Type::Token => write!(f, "token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Type::int(8).to_string(), "i8");
        assert_eq!(Type::Token.to_string(), "token");
        assert_eq!(
            Type::array(4, Type::int(8)).to_string(),
            "array<4 x i8>"
        );
        assert_eq!(
            Type::Tuple(vec![
                Type::Token,
                Type::array(2, Type::Tuple(vec![Type::int(1)]))
            ])
            .to_string(),
            "tuple<token, array<2 x tuple<i1>>>"
        );
    }
}
