//! Sub-object types and enums shared by several node types.

use crate::object::ObjectSpec;

pub(crate) const DATE_PRESETS: &[&str] = &[
    "data_maximum",
    "last_14d",
    "last_28d",
    "last_30d",
    "last_3d",
    "last_7d",
    "last_90d",
    "last_month",
    "last_quarter",
    "last_week_mon_sun",
    "last_week_sun_sat",
    "last_year",
    "maximum",
    "this_month",
    "this_quarter",
    "this_week_mon_today",
    "this_week_sun_today",
    "this_year",
    "today",
    "yesterday",
];

/// Status values of campaigns, ad sets and ads.
pub(crate) const DELIVERY_STATUSES: &[&str] = &["ACTIVE", "ARCHIVED", "DELETED", "PAUSED"];

pub(crate) const EXECUTION_OPTIONS: &[&str] =
    &["include_recommendations", "synchronous_ad_review", "validate_only"];

pub static TARGETING: ObjectSpec = ObjectSpec {
    type_name: "Targeting",
    fields: &[
        "age_max",
        "age_min",
        "custom_audiences",
        "excluded_custom_audiences",
        "flexible_spec",
        "genders",
        "geo_locations",
        "interests",
        "locales",
        "publisher_platforms",
        "targeting_automation",
    ],
    field_types: &[
        ("age_max", "unsigned int"),
        ("age_min", "unsigned int"),
        ("custom_audiences", "list<RawCustomAudience>"),
        ("geo_locations", "TargetingGeoLocation"),
        ("genders", "list<unsigned int>"),
        ("locales", "list<int>"),
        ("publisher_platforms", "list<string>"),
    ],
    ..ObjectSpec::ANY
};

pub static AD_LABEL: ObjectSpec = ObjectSpec {
    type_name: "AdLabel",
    endpoint: Some("adlabels"),
    fields: &["account", "created_time", "id", "name", "updated_time"],
    field_types: &[
        ("account", "AdAccount"),
        ("created_time", "datetime"),
        ("id", "string"),
        ("name", "string"),
        ("updated_time", "datetime"),
    ],
    ..ObjectSpec::ANY
};
