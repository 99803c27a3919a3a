use crate::crud::{CallOutcome, RequestMode};
use crate::errors::GraphApiResult;
use crate::object::ObjectSpec;
use crate::params::Params;

use super::ad::AD;
use super::ad_creative::AD_CREATIVE;
use super::ads_insights::{ADS_INSIGHTS, insights_checker};
use super::campaign::{BID_STRATEGIES, ads_checker};
use super::common::{DATE_PRESETS, DELIVERY_STATUSES, EXECUTION_OPTIONS};
use super::read_edge;
use crate::type_checker::ParamChecker;

const BILLING_EVENTS: &[&str] = &[
    "APP_INSTALLS",
    "CLICKS",
    "IMPRESSIONS",
    "LINK_CLICKS",
    "LISTING_INTERACTION",
    "NONE",
    "OFFER_CLAIMS",
    "PAGE_LIKES",
    "POST_ENGAGEMENT",
    "PURCHASE",
    "THRUPLAY",
];

const OPTIMIZATION_GOALS: &[&str] = &[
    "AD_RECALL_LIFT",
    "APP_INSTALLS",
    "CONVERSATIONS",
    "ENGAGED_USERS",
    "IMPRESSIONS",
    "LANDING_PAGE_VIEWS",
    "LEAD_GENERATION",
    "LINK_CLICKS",
    "NONE",
    "OFFSITE_CONVERSIONS",
    "PAGE_LIKES",
    "POST_ENGAGEMENT",
    "QUALITY_LEAD",
    "REACH",
    "THRUPLAY",
    "VALUE",
    "VISIT_INSTAGRAM_PROFILE",
];

pub static AD_SET: ObjectSpec = ObjectSpec {
    type_name: "AdSet",
    endpoint: Some("adsets"),
    fields: &[
        "account_id",
        "adlabels",
        "bid_amount",
        "bid_strategy",
        "billing_event",
        "budget_remaining",
        "campaign",
        "campaign_id",
        "configured_status",
        "created_time",
        "daily_budget",
        "destination_type",
        "effective_status",
        "end_time",
        "id",
        "lifetime_budget",
        "name",
        "optimization_goal",
        "pacing_type",
        "promoted_object",
        "start_time",
        "status",
        "targeting",
        "updated_time",
        "campaign_spec",
        "execution_options",
    ],
    field_types: &[
        ("adlabels", "list<AdLabel>"),
        ("campaign", "Campaign"),
        ("daily_budget", "string"),
        ("lifetime_budget", "string"),
        ("pacing_type", "list<string>"),
        ("targeting", "Targeting"),
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
        ("bid_amount", "int"),
        ("bid_strategy", "bid_strategy_enum"),
        ("billing_event", "billing_event_enum"),
        ("campaign_id", "string"),
        ("daily_budget", "unsigned int"),
        ("end_time", "datetime"),
        ("execution_options", "list<execution_options_enum>"),
        ("lifetime_budget", "unsigned int"),
        ("name", "string"),
        ("optimization_goal", "optimization_goal_enum"),
        ("pacing_type", "list<string>"),
        ("promoted_object", "Object"),
        ("start_time", "datetime"),
        ("status", "status_enum"),
        ("targeting", "Targeting"),
    ],
    enums: &[
        ("bid_strategy_enum", BID_STRATEGIES),
        ("billing_event_enum", BILLING_EVENTS),
        ("date_preset_enum", DATE_PRESETS),
        ("execution_options_enum", EXECUTION_OPTIONS),
        ("optimization_goal_enum", OPTIMIZATION_GOALS),
        ("status_enum", DELIVERY_STATUSES),
    ],
};

node_type!(
    /// An ad set: targeting, schedule and bidding for a group of ads.
    AdSet,
    AD_SET
);

impl AdSet {
    pub async fn get_ads(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD, ads_checker(), fields, params, mode).await
    }

    pub async fn get_ad_creatives(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD_CREATIVE, ParamChecker::empty(), fields, params, mode).await
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
    use crate::api::GraphApi;
    use crate::config::GraphConfig;
    use http_transport::ScriptedTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn pending_ads_read_is_not_sent() {
        let transport = ScriptedTransport::new();
        let cfg = GraphConfig::new("tok").with_base_url("https://graph.test");
        let ad_set = AdSet::new(GraphApi::with_transport(&cfg, Arc::new(transport.clone())), "77");

        let fields = vec!["name".to_string(), "status".to_string()];
        let mut params = Params::new();
        params.insert("effective_status".into(), json!(["ACTIVE", "PAUSED"]));
        let request = ad_set
            .get_ads(Some(&fields), params, RequestMode::Pending)
            .await
            .unwrap()
            .into_request()
            .unwrap();

        assert_eq!(transport.request_count(), 0);
        assert_eq!(request.endpoint(), "ads");
        assert_eq!(request.fields().to_vec(), fields);
        assert_eq!(request.params()["effective_status"], json!(["ACTIVE", "PAUSED"]));
    }

    #[test]
    fn update_checker_knows_billing_events() {
        let checker = AD_SET.update_checker();
        assert!(checker.is_valid_pair("billing_event", &json!("IMPRESSIONS")));
        assert!(!checker.is_valid_pair("billing_event", &json!("SMILES")));
        assert!(checker.is_valid_pair("targeting", &json!({"geo_locations": {"countries": ["US"]}})));
    }
}
