use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

use flow_core::{FieldAsset, GroupAsset, GroupId, LabelAsset, LabelId, OrgAssets, OrgId};

use crate::error::PersistenceError;
use crate::schema::{contacts_contactfield, contacts_contactgroup, msgs_label};

/// Lee grupos, etiquetas y campos activos de `org_id`.
pub fn load_org_assets(conn: &mut PgConnection, org_id: OrgId) -> Result<OrgAssets, PersistenceError> {
    debug!("load_org_assets:start org_id={org_id}");
    let groups: Vec<(i64, Uuid, String)> =
        contacts_contactgroup::table.filter(contacts_contactgroup::org_id.eq(org_id.0))
                                    .filter(contacts_contactgroup::is_active.eq(true))
                                    .select((contacts_contactgroup::id, contacts_contactgroup::uuid, contacts_contactgroup::name))
                                    .load(conn)?;
    let labels: Vec<(i64, Uuid, String)> = msgs_label::table.filter(msgs_label::org_id.eq(org_id.0))
                                                            .filter(msgs_label::is_active.eq(true))
                                                            .select((msgs_label::id, msgs_label::uuid, msgs_label::name))
                                                            .load(conn)?;
    let fields: Vec<(String, String)> =
        contacts_contactfield::table.filter(contacts_contactfield::org_id.eq(org_id.0))
                                    .filter(contacts_contactfield::is_active.eq(true))
                                    .select((contacts_contactfield::key, contacts_contactfield::label))
                                    .load(conn)?;

    debug!("load_org_assets:done org_id={org_id} groups={} labels={} fields={}",
           groups.len(),
           labels.len(),
           fields.len());
    let mut assets = OrgAssets::new(org_id);
    for (id, uuid, name) in groups {
        assets = assets.with_group(GroupAsset { id: GroupId(id),
                                                uuid,
                                                name });
    }
    for (id, uuid, name) in labels {
        assets = assets.with_label(LabelAsset { id: LabelId(id),
                                                uuid,
                                                name });
    }
    for (key, name) in fields {
        assets = assets.with_field(FieldAsset { key, name });
    }
    Ok(assets)
}
