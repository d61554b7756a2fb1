//! Binding keys: a contract plus an optional tag.

use std::borrow::Cow;
use std::fmt;

use crate::contract::{ContractType, GenericContract, GenericDefinition};

/// Secondary discriminator between bindings of the same contract.
///
/// [`Tag::Any`] is a wildcard: a binding registered with it serves every tag
/// requested for its contract, including no tag at all.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Int(i64),
    Text(Cow<'static, str>),
    Any,
}

impl From<i64> for Tag {
    fn from(value: i64) -> Self {
        Tag::Int(value)
    }
}

impl From<i32> for Tag {
    fn from(value: i32) -> Self {
        Tag::Int(value.into())
    }
}

impl From<&'static str> for Tag {
    fn from(value: &'static str) -> Self {
        Tag::Text(Cow::Borrowed(value))
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::Text(Cow::Owned(value))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Int(value) => write!(f, "{}", value),
            Tag::Text(value) => write!(f, "\"{}\"", value),
            Tag::Any => f.write_str("*"),
        }
    }
}

/// Identifies one binding in a container table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    contract: ContractType,
    tag: Option<Tag>,
}

impl Key {
    pub fn new(contract: ContractType, tag: Option<Tag>) -> Self {
        Self { contract, tag }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ContractType::of::<T>(), None)
    }

    pub fn tagged<T: ?Sized + 'static>(tag: impl Into<Tag>) -> Self {
        Self::new(ContractType::of::<T>(), Some(tag.into()))
    }

    pub fn generic<G: GenericContract>() -> Self {
        Self::new(ContractType::generic::<G>(), None)
    }

    /// Key serving every closed form of `definition`, whatever the tag.
    pub fn open(definition: GenericDefinition) -> Self {
        Self::new(ContractType::definition(definition), Some(Tag::Any))
    }

    /// Same contract, any tag.
    pub fn any(self) -> Self {
        self.with_tag(Some(Tag::Any))
    }

    pub fn with_tag(self, tag: Option<Tag>) -> Self {
        Self {
            contract: self.contract,
            tag,
        }
    }

    pub fn contract(&self) -> &ContractType {
        &self.contract
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    pub fn is_any_tag(&self) -> bool {
        matches!(self.tag, Some(Tag::Any))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}({})", self.contract, tag),
            None => write!(f, "{}", self.contract),
        }
    }
}
