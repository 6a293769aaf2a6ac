//! Esquema Diesel escrito a mano. Reemplazable con `diesel print-schema`.

diesel::table! {
    batch_records (id) {
        id -> Uuid,
        row_seq -> BigInt,
        lot_id -> Nullable<Text>,
        status -> Text,
        product_family -> Text,
        created_at -> Timestamptz,
        branch -> Text,
        preparer -> Text,
        manufacture_date -> Date,
        product_code -> Text,
        batch_size -> Double,
        ph -> Nullable<Double>,
        solids_1 -> Nullable<Double>,
        solids_1_temperature -> Nullable<Double>,
        solids_2 -> Nullable<Double>,
        solids_2_temperature -> Nullable<Double>,
        appearance -> Nullable<Text>,
        color -> Text,
        aroma -> Text,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    lot_sequences (branch, product_code, manufacture_date) {
        branch -> Text,
        product_code -> Text,
        manufacture_date -> Date,
        last_seq -> Integer,
    }
}

diesel::allow_tables_to_appear_in_same_query!(batch_records, lot_sequences,);
