//! Assets de la organización (grupos, etiquetas, campos).
//!
//! Valor de sólo lectura que el committer pasa a cada handler y hook. El
//! pipeline no interpreta su contenido; los handlers lo usan para resolver
//! referencias por UUID/key a ids de base de datos.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::OrgId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAsset {
    pub id: GroupId,
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAsset {
    pub id: LabelId,
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAsset {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct OrgAssets {
    org_id: OrgId,
    groups: HashMap<Uuid, GroupAsset>,
    labels: HashMap<Uuid, LabelAsset>,
    fields: HashMap<String, FieldAsset>,
}

impl OrgAssets {
    pub fn new(org_id: OrgId) -> Self {
        Self { org_id,
               ..Default::default() }
    }

    pub fn with_group(mut self, group: GroupAsset) -> Self {
        self.groups.insert(group.uuid, group);
        self
    }

    pub fn with_label(mut self, label: LabelAsset) -> Self {
        self.labels.insert(label.uuid, label);
        self
    }

    pub fn with_field(mut self, field: FieldAsset) -> Self {
        self.fields.insert(field.key.clone(), field);
        self
    }

    pub fn org_id(&self) -> OrgId {
        self.org_id
    }

    pub fn group(&self, uuid: &Uuid) -> Option<&GroupAsset> {
        self.groups.get(uuid)
    }

    pub fn label(&self, uuid: &Uuid) -> Option<&LabelAsset> {
        self.labels.get(uuid)
    }

    pub fn field(&self, key: &str) -> Option<&FieldAsset> {
        self.fields.get(key)
    }
}
