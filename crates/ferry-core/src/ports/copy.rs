//! ExternalCopy port - isolate 境界を越える値コピーの抽象化
//!
//! 値やエラーは isolate 間で参照共有されません。境界を越えるものは必ず
//! ここで context-independent な形（`PortableValue` / `PortableError`）に
//! コピーアウトされ、相手側でコピーインされます。
//!
//! # 実装
//! - **DeepCopy**: JSON deep clone（デフォルト）

use thiserror::Error;

use crate::domain::{IsolateId, LocalError, LocalValue, PortableError, PortableValue};

/// CopyError はコピーアウト失敗の分類
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("value is not copyable: {0}")]
    NotCopyable(String),
}

/// ExternalCopy は isolate 境界を越える値の複製サービス
///
/// # 契約
/// - `copy_out` / `copy_out_error` は値の内容だけを運ぶ（参照やアイデンティティは
///   運ばない）
/// - `copy_in` / `copy_in_error` は必ず新しいインスタンスを作る
/// - `copy_out_error` が `None` を返した場合、プロトコル側が呼び出し元で
///   generic なエラーを合成する
pub trait ExternalCopy: Send + Sync {
    fn copy_out(&self, value: &LocalValue) -> Result<PortableValue, CopyError>;

    fn copy_in(&self, value: &PortableValue, home: IsolateId) -> LocalValue;

    fn copy_out_error(&self, error: &LocalError) -> Option<PortableError>;

    fn copy_in_error(&self, error: &PortableError) -> LocalError;
}

/// DeepCopy は JSON deep clone によるデフォルト実装
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepCopy;

impl ExternalCopy for DeepCopy {
    fn copy_out(&self, value: &LocalValue) -> Result<PortableValue, CopyError> {
        Ok(PortableValue::new(value.peek().clone()))
    }

    fn copy_in(&self, value: &PortableValue, home: IsolateId) -> LocalValue {
        LocalValue::new(home, value.json().clone())
    }

    fn copy_out_error(&self, error: &LocalError) -> Option<PortableError> {
        Some(PortableError::of(error))
    }

    fn copy_in_error(&self, error: &PortableError) -> LocalError {
        error.to_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn id() -> IsolateId {
        IsolateId::from_ulid(Ulid::new())
    }

    #[test]
    fn deep_copy_rehomes_values() {
        let copier = DeepCopy;
        let source = id();
        let destination = id();

        let local = LocalValue::new(source, serde_json::json!({"n": 4}));
        let portable = copier.copy_out(&local).unwrap();
        let back = copier.copy_in(&portable, destination);

        assert_eq!(back.home(), destination);
        assert_eq!(back.peek(), local.peek());
    }

    #[test]
    fn deep_copy_never_preserves_error_identity() {
        let copier = DeepCopy;
        let original = LocalError::range_error("bad");

        let portable = copier.copy_out_error(&original).unwrap();
        let back = copier.copy_in_error(&portable);

        assert_eq!(back.message(), "bad");
        assert_eq!(back.name(), "RangeError");
        assert_ne!(back.identity(), original.identity());
    }
}
