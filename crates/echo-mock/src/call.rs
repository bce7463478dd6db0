// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Call descriptors handed to the engine by the proxy layer.

use std::fmt;

use crate::error::MockError;
use crate::member::{Member, ReturnType};
use crate::value::{TypeRef, Value};

/// One intercepted call: the member, the concrete type arguments it was
/// instantiated at, and the argument values (by-ref slots hold their current
/// contents).
///
/// By-reference positions are taken from the member's parameter list.
#[derive(Clone, Debug)]
pub struct Call {
    member: Member,
    type_args: Vec<TypeRef>,
    args: Vec<Value>,
}

impl Call {
    /// Describes a call.
    pub fn new(member: Member, type_args: Vec<TypeRef>, args: Vec<Value>) -> Self {
        Self {
            member,
            type_args,
            args,
        }
    }

    /// The called member.
    pub fn member(&self) -> &Member {
        &self.member
    }

    /// Concrete type arguments, one per generic parameter.
    pub fn type_args(&self) -> &[TypeRef] {
        &self.type_args
    }

    /// Concrete type argument at `index`.
    pub fn type_arg(&self, index: usize) -> Option<&TypeRef> {
        self.type_args.get(index)
    }

    /// Argument values.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Argument value at `index`.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Concrete return type, or `None` for a void member.
    ///
    /// Generic return types resolve to the call's type argument, so a member
    /// declared `T Method<T>()` called as `Method::<Vec<i32>>` returns
    /// `Vec<i32>` here.
    pub fn return_type(&self) -> Option<TypeRef> {
        match self.member.returns() {
            ReturnType::Void => None,
            ReturnType::Value(slot) => slot.resolve(&self.type_args),
        }
    }

    /// Concrete type of the parameter at `index`.
    pub fn param_type(&self, index: usize) -> Option<TypeRef> {
        self.member
            .params()
            .get(index)
            .and_then(|p| p.ty.resolve(&self.type_args))
    }

    /// Checks the descriptor against its member.
    pub(crate) fn check(&self) -> Result<(), MockError> {
        if let Some(index) = self.member.dangling_type_param() {
            return Err(MockError::UnknownTypeParameter {
                member: self.member.to_string(),
                index,
            });
        }
        let expected = self.member.type_params().len();
        if self.type_args.len() != expected {
            return Err(MockError::MalformedCall {
                member: self.member.to_string(),
                what: "type arguments",
                expected,
                actual: self.type_args.len(),
            });
        }
        let expected = self.member.params().len();
        if self.args.len() != expected {
            return Err(MockError::MalformedCall {
                member: self.member.to_string(),
                what: "arguments",
                expected,
                actual: self.args.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.member)?;
        if !self.type_args.is_empty() {
            f.write_str("<")?;
            for (i, ty) in self.type_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{ty}")?;
            }
            f.write_str(">")?;
        }
        f.write_str("(")?;
        for (i, (arg, param)) in self.args.iter().zip(self.member.params()).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if param.by_ref {
                f.write_str("ref ")?;
            }
            write!(f, "{arg:?}")?;
        }
        f.write_str(")")
    }
}
