//! OpRegistry - 名前付き Operation の登録と管理
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Associated Constants (`const NAME`) による名前と型の対応付け
//! - Object-safe trait (DynOperation) への type erasure
//!
//! Registry は isolate の起動前に組み立てられ、起動後は不変として使われます。
//! （初期化時は mutable、実行時は immutable。ロックが不要になる。）

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::domain::{LocalError, PortableValue};
use crate::isolate::ContextScope;
use crate::typed::codec::PayloadCodec;

/// Operation は対象 isolate に常駐する名前付き処理
///
/// # 使用例
/// ```ignore
/// struct Add;
///
/// impl Operation for Add {
///     const NAME: &'static str = "math.add.v1";
///     type Input = AddInput;
///     type Output = i64;
///
///     fn run(&self, _scope: &ContextScope<'_>, input: AddInput) -> Result<i64, LocalError> {
///         Ok(input.a + input.b)
///     }
/// }
/// ```
///
/// # 命名規約
/// - `{namespace}.{action}.v{major}`
pub trait Operation: Send + Sync + 'static {
    /// Operation 名の定義
    const NAME: &'static str;

    type Input: DeserializeOwned + Send;
    type Output: Serialize;

    /// 対象 isolate の中で実行される本体
    fn run(&self, scope: &ContextScope<'_>, input: Self::Input)
    -> Result<Self::Output, LocalError>;
}

/// DynOperation は object-safe な Operation の抽象化
///
/// TypedOperation<O> を DynOperation に変換することで、
/// HashMap<String, Arc<dyn DynOperation>> に格納可能にします。
pub trait DynOperation: Send + Sync {
    fn invoke(
        &self,
        scope: &ContextScope<'_>,
        input: &PortableValue,
    ) -> Result<PortableValue, LocalError>;

    fn name(&self) -> &str;
}

struct TypedOperation<O: Operation> {
    op: O,
}

impl<O: Operation> DynOperation for TypedOperation<O> {
    fn invoke(
        &self,
        scope: &ContextScope<'_>,
        input: &PortableValue,
    ) -> Result<PortableValue, LocalError> {
        let input: O::Input =
            PayloadCodec::decode(input).map_err(|e| LocalError::type_error(e.to_string()))?;
        let output = self.op.run(scope, input)?;
        PayloadCodec::encode(&output).map_err(|e| LocalError::type_error(e.to_string()))
    }

    fn name(&self) -> &str {
        O::NAME
    }
}

/// RegistryError は OpRegistry の操作エラー
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("operation '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// OpRegistry は名前付き Operation を登録・管理
#[derive(Default)]
pub struct OpRegistry {
    ops: HashMap<String, Arc<dyn DynOperation>>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    pub fn register<O: Operation>(&mut self, op: O) -> Result<(), RegistryError> {
        let name = O::NAME.to_string();
        if self.ops.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.ops.insert(name, Arc::new(TypedOperation { op }));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DynOperation>> {
        self.ops.get(name).cloned()
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.ops.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isolate::Platform;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    struct Add;

    impl Operation for Add {
        const NAME: &'static str = "math.add.v1";
        type Input = AddInput;
        type Output = i64;

        fn run(&self, _scope: &ContextScope<'_>, input: AddInput) -> Result<i64, LocalError> {
            Ok(input.a + input.b)
        }
    }

    struct Shout;

    impl Operation for Shout {
        const NAME: &'static str = "text.shout.v1";
        type Input = String;
        type Output = String;

        fn run(&self, _scope: &ContextScope<'_>, input: String) -> Result<String, LocalError> {
            Ok(input.to_uppercase())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = OpRegistry::new();
        registry.register(Add).unwrap();

        let op = registry.get(Add::NAME);
        assert!(op.is_some());
        assert_eq!(op.unwrap().name(), "math.add.v1");
    }

    #[test]
    fn test_double_registration() {
        let mut registry = OpRegistry::new();
        registry.register(Add).unwrap();
        let result = registry.register(Add);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_registered_names() {
        let mut registry = OpRegistry::new();
        registry.register(Add).unwrap();
        let names = registry.registered_names();
        assert_eq!(names, vec![Add::NAME.to_string()]);
    }

    #[test]
    fn test_invoke_decodes_runs_and_encodes() {
        let mut registry = OpRegistry::new();
        registry.register(Add).unwrap();
        registry.register(Shout).unwrap();

        let platform = Platform::new();
        let env = platform.primary().get().unwrap();

        env.enter(|scope| {
            let add = registry.get("math.add.v1").unwrap();
            let input = PortableValue::new(serde_json::json!({"a": 2, "b": 3}));
            let output = add.invoke(scope, &input).unwrap();
            assert_eq!(output.json(), &serde_json::json!(5));

            // 異なる Operation 型が混同できないこと
            let shout = registry.get("text.shout.v1").unwrap();
            let output = shout
                .invoke(scope, &PortableValue::new(serde_json::json!("hey")))
                .unwrap();
            assert_eq!(output.json(), &serde_json::json!("HEY"));
        });
    }

    #[test]
    fn test_invoke_reports_decode_errors() {
        let mut registry = OpRegistry::new();
        registry.register(Add).unwrap();

        let platform = Platform::new();
        let env = platform.primary().get().unwrap();

        env.enter(|scope| {
            let add = registry.get("math.add.v1").unwrap();
            let bad_input = PortableValue::new(serde_json::json!("not an object"));
            let error = add.invoke(scope, &bad_input).unwrap_err();
            assert_eq!(error.name(), "TypeError");
            assert!(error.message().contains("decode"));
        });
    }
}
