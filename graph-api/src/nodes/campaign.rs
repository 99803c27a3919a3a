use crate::crud::{CallOutcome, RequestMode};
use crate::errors::GraphApiResult;
use crate::object::ObjectSpec;
use crate::params::Params;
use crate::type_checker::ParamChecker;

use super::ad::AD;
use super::ad_set::AD_SET;
use super::ads_insights::{ADS_INSIGHTS, insights_checker};
use super::common::{DATE_PRESETS, DELIVERY_STATUSES, EXECUTION_OPTIONS};
use super::read_edge;

pub(crate) const OBJECTIVES: &[&str] = &[
    "APP_INSTALLS",
    "BRAND_AWARENESS",
    "CONVERSIONS",
    "EVENT_RESPONSES",
    "LEAD_GENERATION",
    "LINK_CLICKS",
    "LOCAL_AWARENESS",
    "MESSAGES",
    "OFFER_CLAIMS",
    "OUTCOME_APP_PROMOTION",
    "OUTCOME_AWARENESS",
    "OUTCOME_ENGAGEMENT",
    "OUTCOME_LEADS",
    "OUTCOME_SALES",
    "OUTCOME_TRAFFIC",
    "PAGE_LIKES",
    "POST_ENGAGEMENT",
    "PRODUCT_CATALOG_SALES",
    "REACH",
    "STORE_VISITS",
    "VIDEO_VIEWS",
];

pub(crate) const BID_STRATEGIES: &[&str] = &[
    "COST_CAP",
    "LOWEST_COST_WITHOUT_CAP",
    "LOWEST_COST_WITH_BID_CAP",
    "LOWEST_COST_WITH_MIN_ROAS",
];

pub(crate) const SPECIAL_AD_CATEGORIES: &[&str] = &[
    "CREDIT",
    "EMPLOYMENT",
    "FINANCIAL_PRODUCTS_SERVICES",
    "HOUSING",
    "ISSUES_ELECTIONS_POLITICS",
    "NONE",
    "ONLINE_GAMBLING_AND_GAMING",
];

const EFFECTIVE_STATUSES: &[&str] = &[
    "ACTIVE",
    "ARCHIVED",
    "DELETED",
    "IN_PROCESS",
    "PAUSED",
    "WITH_ISSUES",
];

pub static CAMPAIGN: ObjectSpec = ObjectSpec {
    type_name: "Campaign",
    endpoint: Some("campaigns"),
    fields: &[
        "account_id",
        "adlabels",
        "bid_strategy",
        "boosted_object_id",
        "budget_remaining",
        "buying_type",
        "configured_status",
        "created_time",
        "daily_budget",
        "effective_status",
        "id",
        "issues_info",
        "lifetime_budget",
        "name",
        "objective",
        "promoted_object",
        "source_campaign",
        "source_campaign_id",
        "special_ad_categories",
        "spend_cap",
        "start_time",
        "status",
        "stop_time",
        "updated_time",
        "execution_options",
    ],
    field_types: &[
        ("adlabels", "list<AdLabel>"),
        ("daily_budget", "string"),
        ("lifetime_budget", "string"),
        ("source_campaign", "Campaign"),
        ("special_ad_categories", "list<SpecialAdCategories>"),
    ],
    default_read_fields: &[],
    read_params: &[
        ("am_call_tags", "map"),
        ("date_preset", "date_preset_enum"),
        ("from_adtable", "bool"),
        ("time_range", "map"),
    ],
    update_params: &[
        ("adlabels", "list<Object>"),
        ("bid_strategy", "bid_strategy_enum"),
        ("budget_rebalance_flag", "bool"),
        ("daily_budget", "unsigned int"),
        ("execution_options", "list<execution_options_enum>"),
        ("lifetime_budget", "unsigned int"),
        ("name", "string"),
        ("objective", "objective_enum"),
        ("promoted_object", "Object"),
        ("special_ad_categories", "list<special_ad_categories_enum>"),
        ("spend_cap", "unsigned int"),
        ("start_time", "datetime"),
        ("status", "status_enum"),
        ("stop_time", "datetime"),
    ],
    enums: &[
        ("bid_strategy_enum", BID_STRATEGIES),
        ("date_preset_enum", DATE_PRESETS),
        ("effective_status_enum", EFFECTIVE_STATUSES),
        ("execution_options_enum", EXECUTION_OPTIONS),
        ("objective_enum", OBJECTIVES),
        ("special_ad_categories_enum", SPECIAL_AD_CATEGORIES),
        ("status_enum", DELIVERY_STATUSES),
    ],
};

/// Param types of the `campaigns` and `adsets` edge listings.
pub(crate) fn listing_checker() -> ParamChecker {
    CAMPAIGN.checker(&[
        ("date_preset", "date_preset_enum"),
        ("effective_status", "list<effective_status_enum>"),
        ("is_completed", "bool"),
        ("time_range", "map"),
    ])
}

/// Param types of the `ads` edge listing.
pub(crate) fn ads_checker() -> ParamChecker {
    CAMPAIGN.checker(&[
        ("date_preset", "date_preset_enum"),
        ("effective_status", "list<string>"),
        ("time_range", "map"),
        ("updated_since", "int"),
    ])
}

node_type!(
    /// A campaign: objective and budget shared by its ad sets.
    Campaign,
    CAMPAIGN
);

impl Campaign {
    pub async fn get_ad_sets(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD_SET, listing_checker(), fields, params, mode).await
    }

    pub async fn get_ads(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD, ads_checker(), fields, params, mode).await
    }

    pub async fn get_insights(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &ADS_INSIGHTS, insights_checker(), fields, params, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_checker_knows_objectives() {
        let checker = CAMPAIGN.update_checker();
        assert!(checker.is_valid_pair("objective", &json!("OUTCOME_SALES")));
        assert!(!checker.is_valid_pair("objective", &json!("WIN")));
        assert!(checker.is_valid_pair("special_ad_categories", &json!(["NONE"])));
        assert!(!checker.is_valid_pair("daily_budget", &json!(-1)));
    }

    #[test]
    fn ad_set_listing_checks_effective_status() {
        let checker = listing_checker();
        assert!(checker.is_valid_pair("effective_status", &json!(["ACTIVE", "PAUSED"])));
        assert!(!checker.is_valid_pair("effective_status", &json!(["RUNNING"])));
    }
}
