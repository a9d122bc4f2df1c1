//! Identifier newtypes.

mod id_macro;

use id_macro::impl_id;
use serde::{Deserialize, Serialize};

/// Identity of a file selected in the upload workspace.
///
/// Generated at selection time; never reused after the file is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(String);

/// Identity of a generated 3D model in the download center.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(String);

/// User id as issued by the hosted session holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl_id!(FileId, ModelId, UserId);
