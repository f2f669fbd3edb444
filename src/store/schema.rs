// Diesel table definitions for the target registration schema.

diesel::table! {
    zone (code) {
        code -> Text,
        name -> Text,
    }
}

diesel::table! {
    hospital (code) {
        code -> Text,
        hospital_type -> Nullable<Text>,
        name -> Nullable<Text>,
        zone_code -> Nullable<Text>,
        province -> Nullable<Text>,
    }
}

diesel::table! {
    member (id) {
        id -> Integer,
        hospital_code -> Nullable<Text>,
        email -> Nullable<Text>,
        password -> Nullable<Text>,
        prefix -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        position -> Nullable<Text>,
        phone -> Nullable<Text>,
        status -> Nullable<Integer>,
        created_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    attendee (id) {
        id -> Integer,
        hospital_code -> Nullable<Text>,
        prefix -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        position -> Nullable<Text>,
        phone -> Nullable<Text>,
        email -> Nullable<Text>,
        food_type -> Nullable<Text>,
        hotel_name -> Nullable<Text>,
        check_in -> Nullable<Timestamp>,
        check_out -> Nullable<Timestamp>,
        status -> Nullable<Integer>,
        created_by -> Nullable<Integer>,
        created_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    finance (id) {
        id -> Integer,
        hospital_code -> Nullable<Text>,
        amount -> Nullable<Double>,
        paid_at -> Nullable<Timestamp>,
        slip_file -> Nullable<Text>,
        status -> Nullable<Integer>,
        note -> Nullable<Text>,
        member_id -> Nullable<Integer>,
        created_at -> Nullable<Timestamp>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(zone, hospital, member, attendee, finance,);
