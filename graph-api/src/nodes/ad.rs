use crate::crud::{CallOutcome, RequestMode};
use crate::errors::GraphApiResult;
use crate::object::ObjectSpec;
use crate::params::Params;
use crate::type_checker::ParamChecker;

use super::ad_creative::AD_CREATIVE;
use super::ads_insights::{ADS_INSIGHTS, insights_checker};
use super::common::{DATE_PRESETS, DELIVERY_STATUSES, EXECUTION_OPTIONS};
use super::read_edge;

pub static AD: ObjectSpec = ObjectSpec {
    type_name: "Ad",
    endpoint: Some("ads"),
    fields: &[
        "account_id",
        "ad_active_time",
        "ad_review_feedback",
        "ad_schedule_end_time",
        "ad_schedule_start_time",
        "adlabels",
        "adset",
        "adset_id",
        "bid_amount",
        "bid_info",
        "bid_type",
        "campaign",
        "campaign_id",
        "configured_status",
        "conversion_domain",
        "created_time",
        "creative",
        "display_sequence",
        "effective_status",
        "engagement_audience",
        "id",
        "issues_info",
        "name",
        "preview_shareable_link",
        "priority",
        "source_ad",
        "source_ad_id",
        "status",
        "targeting",
        "tracking_specs",
        "updated_time",
        "adset_spec",
        "audience_id",
        "date_format",
        "draft_adgroup_id",
        "execution_options",
        "include_demolink_hashes",
        "filename",
    ],
    field_types: &[
        ("adlabels", "list<AdLabel>"),
        ("adset", "AdSet"),
        ("bid_info", "map<string, unsigned int>"),
        ("campaign", "Campaign"),
        ("creative", "AdCreative"),
        ("source_ad", "Ad"),
        ("targeting", "Targeting"),
        ("adset_spec", "AdSet"),
        ("filename", "file"),
    ],
    default_read_fields: &[],
    read_params: &[
        ("am_call_tags", "map"),
        ("date_preset", "date_preset_enum"),
        ("from_adtable", "bool"),
        ("review_feedback_breakdown", "bool"),
        ("time_range", "map"),
    ],
    update_params: &[
        ("ad_schedule_end_time", "datetime"),
        ("ad_schedule_start_time", "datetime"),
        ("adlabels", "list<Object>"),
        ("adset_spec", "AdSet"),
        ("audience_id", "string"),
        ("bid_amount", "int"),
        ("conversion_domain", "string"),
        ("creative", "AdCreative"),
        ("display_sequence", "unsigned int"),
        ("draft_adgroup_id", "string"),
        ("engagement_audience", "bool"),
        ("execution_options", "list<execution_options_enum>"),
        ("include_demolink_hashes", "bool"),
        ("name", "string"),
        ("priority", "unsigned int"),
        ("status", "status_enum"),
        ("tracking_specs", "Object"),
    ],
    enums: &[
        ("date_preset_enum", DATE_PRESETS),
        ("execution_options_enum", EXECUTION_OPTIONS),
        ("status_enum", DELIVERY_STATUSES),
    ],
};

node_type!(
    /// An ad: one creative delivered under an ad set.
    Ad,
    AD
);

impl Ad {
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
