//! Esquema Diesel (mantenido a mano junto a `migrations/`). Reemplazable con
//! `diesel print-schema`.

diesel::table! {
    orgs_org (id) {
        id -> BigInt,
        name -> Text,
    }
}

diesel::table! {
    contacts_contact (id) {
        id -> BigInt,
        uuid -> Uuid,
        org_id -> BigInt,
        name -> Nullable<Text>,
        language -> Nullable<Varchar>,
        fields -> Jsonb,
        created_on -> Timestamptz,
        modified_on -> Timestamptz,
    }
}

diesel::table! {
    contacts_contactgroup (id) {
        id -> BigInt,
        uuid -> Uuid,
        org_id -> BigInt,
        name -> Text,
        is_active -> Bool,
    }
}

diesel::table! {
    contacts_contactgroup_contacts (id) {
        id -> BigInt,
        contactgroup_id -> BigInt,
        contact_id -> BigInt,
    }
}

diesel::table! {
    contacts_contactfield (id) {
        id -> BigInt,
        org_id -> BigInt,
        key -> Text,
        label -> Text,
        is_active -> Bool,
    }
}

diesel::table! {
    msgs_label (id) {
        id -> BigInt,
        uuid -> Uuid,
        org_id -> BigInt,
        name -> Text,
        is_active -> Bool,
    }
}

diesel::table! {
    msgs_msg (id) {
        id -> BigInt,
        uuid -> Uuid,
        org_id -> BigInt,
        contact_id -> BigInt,
        urn -> Nullable<Text>,
        text -> Text,
        direction -> Text,
        status -> Text,
        created_on -> Timestamptz,
        modified_on -> Timestamptz,
    }
}

diesel::table! {
    msgs_msg_labels (id) {
        id -> BigInt,
        msg_id -> BigInt,
        label_id -> BigInt,
    }
}

diesel::joinable!(contacts_contact -> orgs_org (org_id));
diesel::joinable!(contacts_contactgroup_contacts -> contacts_contact (contact_id));
diesel::joinable!(contacts_contactgroup_contacts -> contacts_contactgroup (contactgroup_id));
diesel::joinable!(msgs_msg -> contacts_contact (contact_id));
diesel::joinable!(msgs_msg_labels -> msgs_msg (msg_id));
diesel::joinable!(msgs_msg_labels -> msgs_label (label_id));

diesel::allow_tables_to_appear_in_same_query!(
    orgs_org,
    contacts_contact,
    contacts_contactgroup,
    contacts_contactgroup_contacts,
    contacts_contactfield,
    msgs_label,
    msgs_msg,
    msgs_msg_labels,
);
