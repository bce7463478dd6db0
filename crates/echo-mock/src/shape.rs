// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Call shapes: which member, at which generic instantiation, with which
//! argument rules.
//!
//! Setups are filed under a shape and verification replays the ledger
//! against one. Shapes are validated once, at construction; the registry and
//! verifier trust them afterwards.

use std::fmt;

use crate::call::Call;
use crate::error::ShapeError;
use crate::matcher::Matcher;
use crate::member::{Member, TypeSlot};
use crate::value::TypeRef;

/// Constraint on one generic type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeConstraint {
    /// The call must be instantiated at exactly this type.
    Concrete(TypeRef),
    /// Any instantiation matches. This is a tag, never a type: nothing typed
    /// by it is ever produced.
    AnyType,
}

impl TypeConstraint {
    /// `Concrete(T)`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Concrete(TypeRef::of::<T>())
    }

    /// Whether a call instantiated at `actual` satisfies the constraint.
    pub fn accepts(&self, actual: &TypeRef) -> bool {
        match self {
            Self::Concrete(expected) => expected == actual,
            Self::AnyType => true,
        }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(ty) => write!(f, "{ty}"),
            Self::AnyType => f.write_str("AnyType"),
        }
    }
}

/// Validated description of a set of calls.
///
/// Two shapes are equal when they name the same member with equal type
/// constraints and equal matchers (predicates compare by closure identity);
/// an equal, later setup overrides an earlier one.
#[derive(Clone, Debug, PartialEq)]
pub struct CallShape {
    member: Member,
    type_constraints: Vec<TypeConstraint>,
    matchers: Vec<Matcher>,
}

impl CallShape {
    /// Validates and builds a shape.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] when the constraint or matcher counts differ
    /// from the member's declaration, when a by-reference matcher targets a
    /// by-value parameter, when a literal contradicts a concrete type fixed
    /// for its generic parameter, or when the member itself refers to an
    /// undeclared type parameter.
    pub fn new(
        member: Member,
        type_constraints: Vec<TypeConstraint>,
        matchers: Vec<Matcher>,
    ) -> Result<Self, ShapeError> {
        if let Some(index) = member.dangling_type_param() {
            return Err(ShapeError::UnknownTypeParameter {
                member: member.to_string(),
                index,
            });
        }
        if type_constraints.len() != member.type_params().len() {
            return Err(ShapeError::TypeConstraintCount {
                member: member.to_string(),
                expected: member.type_params().len(),
                actual: type_constraints.len(),
            });
        }
        if matchers.len() != member.params().len() {
            return Err(ShapeError::MatcherCount {
                member: member.to_string(),
                expected: member.params().len(),
                actual: matchers.len(),
            });
        }
        for (index, (matcher, param)) in matchers.iter().zip(member.params()).enumerate() {
            if matcher.is_by_ref() && !param.by_ref {
                return Err(ShapeError::RefMatcherOnValueParam {
                    member: member.to_string(),
                    index,
                    param: param.name,
                });
            }
            let fixed = match param.ty {
                TypeSlot::Concrete(_) => None,
                TypeSlot::Generic(tp) => match type_constraints[tp] {
                    TypeConstraint::Concrete(ty) => Some(ty),
                    TypeConstraint::AnyType => None,
                },
            };
            if let (Some(expected), Some(literal)) = (fixed, matcher.literal_value()) {
                if !expected.describes(literal) {
                    return Err(ShapeError::LiteralTypeMismatch {
                        member: member.to_string(),
                        index,
                        expected: expected.to_string(),
                        actual: crate::value::short_type_name(literal.type_name()),
                    });
                }
            }
        }
        Ok(Self {
            member,
            type_constraints,
            matchers,
        })
    }

    /// Starts a shape for `member`.
    pub fn builder(member: Member) -> ShapeBuilder {
        ShapeBuilder {
            member,
            type_constraints: Vec::new(),
            matchers: Vec::new(),
        }
    }

    /// Shape matching exactly `call`: concrete type arguments and literal
    /// arguments (by-reference positions compare slot contents).
    pub fn exact(call: &Call) -> Self {
        let matchers = call
            .args()
            .iter()
            .zip(call.member().params())
            .map(|(arg, param)| {
                if param.by_ref {
                    Matcher::RefLiteral {
                        value: arg.clone(),
                        identity: false,
                    }
                } else {
                    Matcher::Literal(arg.clone())
                }
            })
            .collect();
        Self {
            member: call.member().clone(),
            type_constraints: call
                .type_args()
                .iter()
                .copied()
                .map(TypeConstraint::Concrete)
                .collect(),
            matchers,
        }
    }

    /// The member this shape describes.
    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Per-type-parameter constraints.
    pub fn type_constraints(&self) -> &[TypeConstraint] {
        &self.type_constraints
    }

    /// Per-argument matchers.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// True when any type parameter is left open.
    pub fn has_open_types(&self) -> bool {
        self.type_constraints
            .iter()
            .any(|c| matches!(c, TypeConstraint::AnyType))
    }

    /// Decides whether `call` belongs to this shape.
    ///
    /// The member must be the same; every type constraint must accept the
    /// call's type argument at its position; every matcher must accept the
    /// argument at its position.
    pub fn matches(&self, call: &Call) -> bool {
        if self.member != *call.member()
            || self.type_constraints.len() != call.type_args().len()
            || self.matchers.len() != call.args().len()
        {
            return false;
        }
        self.type_constraints
            .iter()
            .zip(call.type_args())
            .all(|(constraint, actual)| constraint.accepts(actual))
            && self
                .matchers
                .iter()
                .zip(call.args())
                .all(|(matcher, actual)| matcher.matches(actual))
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.member)?;
        if !self.type_constraints.is_empty() {
            f.write_str("<")?;
            for (i, constraint) in self.type_constraints.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{constraint}")?;
            }
            f.write_str(">")?;
        }
        f.write_str("(")?;
        for (i, matcher) in self.matchers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{matcher}")?;
        }
        f.write_str(")")
    }
}

/// Incremental construction of a [`CallShape`].
///
/// ```
/// use echo_mock::{CallShape, Matcher, Member, TypeConstraint, TypeSlot};
///
/// let member = Member::method("IY", "Method")
///     .type_param("T")
///     .param("arg", TypeSlot::Generic(0))
///     .returns(TypeSlot::Generic(0))
///     .build();
/// let shape = CallShape::builder(member)
///     .any_type()
///     .arg(Matcher::any())
///     .build()
///     .unwrap();
/// assert_eq!(shape.to_string(), "IY::Method<AnyType>(any)");
/// ```
#[derive(Debug)]
pub struct ShapeBuilder {
    member: Member,
    type_constraints: Vec<TypeConstraint>,
    matchers: Vec<Matcher>,
}

impl ShapeBuilder {
    /// Constrains the next type parameter.
    pub fn type_arg(mut self, constraint: TypeConstraint) -> Self {
        self.type_constraints.push(constraint);
        self
    }

    /// Fixes the next type parameter to `T`.
    pub fn type_of<T: ?Sized + 'static>(self) -> Self {
        self.type_arg(TypeConstraint::of::<T>())
    }

    /// Leaves the next type parameter open.
    pub fn any_type(self) -> Self {
        self.type_arg(TypeConstraint::AnyType)
    }

    /// Adds the matcher for the next argument.
    pub fn arg(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Validates and builds the shape.
    ///
    /// # Errors
    /// See [`CallShape::new`].
    pub fn build(self) -> Result<CallShape, ShapeError> {
        CallShape::new(self.member, self.type_constraints, self.matchers)
    }
}
