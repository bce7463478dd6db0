// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-mock: interception, matching and verification engine for test doubles.
//!
//! A proxy layer (hand-written or generated) turns every call on a mocked
//! interface into a [`Call`] and hands it to [`Mock::dispatch`]. The engine
//! picks the most recently registered setup whose [`CallShape`] accepts the
//! call, runs its actions, records an [`Invocation`], and answers with a
//! [`Disposition`]. Afterwards [`Mock::verify`] and friends replay the
//! ledger.
//!
//! Generic members are matched per type parameter: a shape can fix a type
//! argument ([`TypeConstraint::Concrete`]) or leave it open
//! ([`TypeConstraint::AnyType`]) independently of the argument matchers.
//!
//! ```
//! use echo_mock::{Call, CallShape, Matcher, Member, Mock, Times, TypeRef, TypeSlot, Value};
//!
//! // T Echo<T>(T arg)
//! let echo = Member::method("IY", "Echo")
//!     .type_param("T")
//!     .param("arg", TypeSlot::Generic(0))
//!     .returns(TypeSlot::Generic(0))
//!     .build();
//! let mock = Mock::new();
//! mock.setup(CallShape::builder(echo.clone()).any_type().arg(Matcher::any()).build()?)
//!     .returns_with(|frame| Ok(frame.args()[0].clone()))
//!     .register()?;
//!
//! let call = Call::new(echo.clone(), vec![TypeRef::of::<i32>()], vec![Value::new(7i32)]);
//! let out = mock.dispatch(call)?;
//! assert_eq!(out.returned(), Some(&Value::new(7i32)));
//!
//! let any = CallShape::builder(echo).any_type().arg(Matcher::any()).build()?;
//! mock.verify(&any, Times::once())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![forbid(unsafe_code)]

mod call;
mod config;
mod default_value;
mod dispatch;
mod error;
mod frame;
mod ledger;
mod matcher;
mod member;
mod mock;
mod registry;
mod setup;
mod shape;
mod times;
mod value;
mod verify;

pub use call::Call;
pub use config::{ConfigError, ConfigStore, DefaultValueKind, MockConfig};
pub use default_value::{DefaultValuePolicy, DefaultValueProvider};
pub use dispatch::{Disposition, Outcome};
pub use error::{MockError, ShapeError};
pub use frame::{CallFrame, Fault, SlotError, WriteBack};
pub use ledger::{Invocation, InvocationLedger};
pub use matcher::{Matcher, Predicate};
pub use member::{Member, MemberBuilder, MemberInfo, Param, ReturnType, TypeSlot};
pub use mock::{Mock, MockSettings, SetupPhase, WeakMock};
pub use registry::SetupRegistry;
pub use setup::{CallbackFn, ReturnFn, Setup, SetupBuilder, SetupOrigin};
pub use shape::{CallShape, ShapeBuilder, TypeConstraint};
pub use times::{Bounds, Times};
pub use value::{MockValue, TypeRef, Value};
pub use verify::VerificationError;
