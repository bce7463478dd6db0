// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hand-written proxies for the fixture interfaces.
//!
//! They do what generated code would: describe the call, dispatch it, turn
//! the erased return value back into the declared type, and copy
//! by-reference write-backs into the caller's variables when the call
//! returns normally.

use echo_mock::{
    Call, Disposition, Fault, Member, Mock, MockError, MockValue, Outcome, TypeRef, Value,
};
use thiserror::Error;

use crate::members;

/// Failure of a proxied call.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The engine rejected the call.
    #[error(transparent)]
    Mock(#[from] MockError),
    /// The call raised a fault configured on (or returned by) a setup.
    #[error("raised: {0}")]
    Raised(Fault),
    /// A returned or written-back value does not have the declared type.
    #[error("{member}: expected a {expected}, got a {actual}")]
    WrongType {
        /// The called member.
        member: String,
        /// Declared type.
        expected: &'static str,
        /// Type of the produced value.
        actual: &'static str,
    },
    /// The member returns a value but the mock produced none.
    #[error("{member}: no value produced")]
    NoValue {
        /// The called member.
        member: String,
    },
}

fn cast<T: Clone + 'static>(member: &Member, value: &Value) -> Result<T, ProxyError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ProxyError::WrongType {
            member: member.to_string(),
            expected: std::any::type_name::<T>(),
            actual: value.type_name(),
        })
}

fn returned(disposition: Disposition) -> Result<Option<Value>, ProxyError> {
    match disposition.outcome {
        Outcome::Returned(value) => Ok(value),
        Outcome::Raised(fault) => Err(ProxyError::Raised(fault)),
    }
}

fn required<T: Clone + 'static>(member: &Member, value: Option<Value>) -> Result<T, ProxyError> {
    let value = value.ok_or_else(|| ProxyError::NoValue {
        member: member.to_string(),
    })?;
    cast(member, &value)
}

/// Proxy for `IX`, `IY` and `IZ`: the generic fixture members.
#[derive(Debug, Clone)]
pub struct GenericProxy {
    mock: Mock,
}

impl GenericProxy {
    /// Wraps a mock.
    pub fn new(mock: Mock) -> Self {
        Self { mock }
    }

    /// The backing mock.
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// `IX::Method<T>()`.
    pub fn method<T: ?Sized + 'static>(&self) -> Result<(), ProxyError> {
        let member = members::generic_void();
        let call = Call::new(member.clone(), vec![TypeRef::of::<T>()], Vec::new());
        returned(self.mock.dispatch(call)?).map(|_| ())
    }

    /// `IY::Method<T>(arg)`.
    pub fn echo<T: MockValue + Default + Clone>(&self, arg: T) -> Result<T, ProxyError> {
        let member = members::generic_echo();
        let call = Call::new(
            member.clone(),
            vec![TypeRef::defaulted::<T>()],
            vec![Value::new(arg)],
        );
        let value = returned(self.mock.dispatch(call)?)?;
        required(&member, value)
    }

    /// `IY::ByRefMethod<T>(ref arg)`. Write-backs land in `arg` only when
    /// the call returns normally.
    pub fn by_ref<T: MockValue + Default + Clone>(&self, arg: &mut T) -> Result<T, ProxyError> {
        let member = members::generic_by_ref();
        let call = Call::new(
            member.clone(),
            vec![TypeRef::defaulted::<T>()],
            vec![Value::new(arg.clone())],
        );
        let disposition = self.mock.dispatch(call)?;
        let written = disposition
            .write_back(0)
            .map(|v| cast::<T>(&member, v))
            .transpose()?;
        let value = returned(disposition)?;
        if let Some(written) = written {
            *arg = written;
        }
        required(&member, value)
    }

    /// `IZ::Method<T>()`.
    pub fn produce<T: MockValue + Default + Clone>(&self) -> Result<T, ProxyError> {
        let member = members::generic_factory();
        let call = Call::new(member.clone(), vec![TypeRef::defaulted::<T>()], Vec::new());
        let value = returned(self.mock.dispatch(call)?)?;
        required(&member, value)
    }
}

/// Proxy for `IService`. Also the substitute object handed out for
/// `IService` return values.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceProxy {
    mock: Mock,
}

fn wrap_service(mock: &Mock) -> Value {
    Value::new(ServiceProxy::new(mock.clone()))
}

impl ServiceProxy {
    /// Wraps a mock.
    pub fn new(mock: Mock) -> Self {
        Self { mock }
    }

    /// The backing mock.
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// `IService` as a mockable return type.
    pub fn type_ref() -> TypeRef {
        TypeRef::mockable::<ServiceProxy>(wrap_service)
    }

    /// `IService::Ping(n)`.
    pub fn ping(&self, n: i32) -> Result<(), ProxyError> {
        let member = members::service_ping();
        let call = Call::new(member.clone(), Vec::new(), vec![Value::new(n)]);
        returned(self.mock.dispatch(call)?).map(|_| ())
    }

    /// `IService::Name()`.
    pub fn name(&self) -> Result<String, ProxyError> {
        let member = members::service_name();
        let call = Call::new(member.clone(), Vec::new(), Vec::new());
        let value = returned(self.mock.dispatch(call)?)?;
        required(&member, value)
    }
}

/// Proxy for `IFactory`.
#[derive(Debug, Clone)]
pub struct FactoryProxy {
    mock: Mock,
}

impl FactoryProxy {
    /// Wraps a mock.
    pub fn new(mock: Mock) -> Self {
        Self { mock }
    }

    /// The backing mock.
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// `IFactory::Create(name)`.
    pub fn create(&self, name: &str) -> Result<ServiceProxy, ProxyError> {
        let member = members::factory_create();
        let call = Call::new(member.clone(), Vec::new(), vec![Value::new(name.to_owned())]);
        let value = returned(self.mock.dispatch(call)?)?;
        required(&member, value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use echo_mock::{DefaultValuePolicy, MockSettings};

    #[test]
    fn permissive_mock_answers_with_empty_values() {
        let proxy = GenericProxy::new(Mock::new());
        assert_eq!(proxy.produce::<Vec<i32>>().unwrap(), Vec::<i32>::new());
        assert_eq!(proxy.echo(5u8).unwrap(), 0);
        assert!(proxy.method::<bool>().is_ok());
    }

    #[test]
    fn substitutes_are_service_proxies() {
        let mock = Mock::with_settings(
            MockSettings::default().with_default_value(DefaultValuePolicy::EmptySubstitutes),
        );
        let factory = FactoryProxy::new(mock);
        let service = factory.create("a").unwrap();
        assert_eq!(service.name().unwrap(), "");
        assert_eq!(factory.create("a").unwrap(), service);
    }
}
