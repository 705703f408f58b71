// Kept in sync with the DDL in repository/context.rs.

diesel::table! {
    drupal_site (id) {
        id -> Integer,
        domain_name -> Text,
        security_group_name -> Nullable<Text>,
        box_folder -> Nullable<Text>,
    }
}

diesel::table! {
    drupal_pdf_files (id) {
        id -> Integer,
        pdf_uri -> Text,
        parent_uri -> Text,
        drupal_site_id -> Integer,
        file_hash -> Text,
        pdf_returns_404 -> Bool,
        parent_returns_404 -> Bool,
        pdf_is_archived -> Bool,
        passed_contains_accessible_in_title -> Bool,
        pdf_is_removed -> Bool,
        removed_at -> Nullable<Text>,
        scanned_at -> Text,
    }
}

diesel::table! {
    pdf_report (id) {
        id -> Integer,
        pdf_hash -> Text,
        violations -> Integer,
        failed_checks -> Integer,
        tagged -> Bool,
        check_for_image_only -> Bool,
        pdf_text_type -> Text,
        title_set -> Bool,
        language_set -> Bool,
        page_count -> Integer,
        has_form -> Bool,
        created_at -> Text,
    }
}

diesel::table! {
    failure (id) {
        id -> Integer,
        drupal_site_id -> Integer,
        pdf_id -> Nullable<Integer>,
        pdf_uri -> Text,
        parent_uri -> Text,
        error_message -> Text,
        created_at -> Text,
    }
}

diesel::joinable!(drupal_pdf_files -> drupal_site (drupal_site_id));
diesel::joinable!(failure -> drupal_site (drupal_site_id));
diesel::joinable!(failure -> drupal_pdf_files (pdf_id));

diesel::allow_tables_to_appear_in_same_query!(drupal_site, drupal_pdf_files, pdf_report, failure,);
