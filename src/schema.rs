diesel::table! {
    slots (id) {
        id -> Uuid,
        datetime -> Timestamptz,
        available -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        phone -> Text,
        notes -> Text,
        slot_id -> Uuid,
        slot_datetime -> Timestamptz,
        identification_url -> Text,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(slots, appointments);
