use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative operation this crate enforces, keyed by its catalog name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationName {
    #[serde(rename = "lockNow")]
    LockNow,
    #[serde(rename = "wipeData")]
    WipeData,
    #[serde(rename = "wipeDevice")]
    WipeDevice,
    #[serde(rename = "resetPasswordWithToken")]
    ResetPasswordWithToken,
}

impl OperationName {
    pub const ALL: [OperationName; 4] = [
        OperationName::LockNow,
        OperationName::WipeData,
        OperationName::ResetPasswordWithToken,
        OperationName::WipeDevice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::LockNow => "lockNow",
            OperationName::WipeData => "wipeData",
            OperationName::WipeDevice => "wipeDevice",
            OperationName::ResetPasswordWithToken => "resetPasswordWithToken",
        }
    }

    /// Operations that only exist on newer runtime versions. A miss for these
    /// is expected on older hosts.
    pub fn is_optional(&self) -> bool {
        matches!(self, OperationName::WipeDevice)
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    Void,
    Boolean,
    Int,
    Long,
    Object,
}

impl ReturnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnKind::Void => "void",
            ReturnKind::Boolean => "boolean",
            ReturnKind::Int => "int",
            ReturnKind::Long => "long",
            ReturnKind::Object => "object",
        }
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Int,
    Long,
    Boolean,
    Bytes,
    String,
    Object(String),
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Int => f.write_str("int"),
            ParamKind::Long => f.write_str("long"),
            ParamKind::Boolean => f.write_str("boolean"),
            ParamKind::Bytes => f.write_str("byte[]"),
            ParamKind::String => f.write_str("String"),
            ParamKind::Object(name) => f.write_str(name),
        }
    }
}

/// A value crossing the interception boundary, tagged with its kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    Void,
    Bool(bool),
    Int(i32),
    Long(i64),
    Str(String),
    Null,
}

impl TypedValue {
    pub fn kind(&self) -> ReturnKind {
        match self {
            TypedValue::Void => ReturnKind::Void,
            TypedValue::Bool(_) => ReturnKind::Boolean,
            TypedValue::Int(_) => ReturnKind::Int,
            TypedValue::Long(_) => ReturnKind::Long,
            TypedValue::Str(_) | TypedValue::Null => ReturnKind::Object,
        }
    }
}

/// One concrete signature of an operation on the monitored component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OverloadDescriptor {
    pub component: String,
    pub name: String,
    pub params: Vec<ParamKind>,
    pub returns: ReturnKind,
}

impl OverloadDescriptor {
    pub fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamKind>,
        returns: ReturnKind,
    ) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            params,
            returns,
        }
    }

    /// Short signature without the component, e.g. `wipeData(int)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl fmt::Display for OverloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.component, self.signature(), self.returns)
    }
}

/// What the operator sees and what the caller gets back when an operation is
/// blocked.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyEntry {
    pub title: &'static str,
    pub message: &'static str,
    pub placeholder: TypedValue,
    pub notification_offset: i32,
}
