use std::path::Path;

use serde_json::{Map, Value};

use crate::crud::{CallOutcome, RequestMode};
use crate::errors::GraphApiResult;
use crate::object::ObjectSpec;
use crate::params::Params;
use crate::type_checker::ParamChecker;
use crate::video_upload::VideoUploader;

use super::ad::AD;
use super::ad_creative::AD_CREATIVE;
use super::ad_set::AD_SET;
use super::ads_insights::{self, ADS_INSIGHTS, insights_checker};
use super::campaign::{self, CAMPAIGN};
use super::common::DATE_PRESETS;
use super::{create_on_edge, read_edge};

pub static AD_ACCOUNT: ObjectSpec = ObjectSpec {
    type_name: "AdAccount",
    endpoint: Some("adaccounts"),
    fields: &[
        "account_id",
        "account_status",
        "age",
        "amount_spent",
        "balance",
        "business",
        "business_name",
        "created_time",
        "currency",
        "disable_reason",
        "end_advertiser",
        "funding_source",
        "id",
        "is_personal",
        "is_prepay_account",
        "min_daily_budget",
        "name",
        "owner",
        "spend_cap",
        "timezone_id",
        "timezone_name",
        "timezone_offset_hours_utc",
        "tos_accepted",
        "user_tasks",
    ],
    field_types: &[
        ("account_status", "unsigned int"),
        ("age", "float"),
        ("tos_accepted", "map<string, int>"),
        ("user_tasks", "list<string>"),
    ],
    default_read_fields: &[],
    read_params: &[],
    update_params: &[
        ("agency_client_declaration", "map"),
        ("attribution_spec", "list<Object>"),
        ("business_info", "map"),
        ("currency", "string"),
        ("end_advertiser", "string"),
        ("is_notifications_enabled", "bool"),
        ("media_agency", "string"),
        ("name", "string"),
        ("partner", "string"),
        ("spend_cap", "float"),
        ("spend_cap_action", "string"),
        ("timezone_id", "unsigned int"),
    ],
    enums: &[("date_preset_enum", DATE_PRESETS)],
};

node_type!(
    /// An ad account (`act_<id>`), the parent of campaigns, ad sets and ads.
    AdAccount,
    AD_ACCOUNT
);

impl AdAccount {
    pub async fn get_ads(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD, campaign::ads_checker(), fields, params, mode).await
    }

    pub async fn get_campaigns(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &CAMPAIGN, campaign::listing_checker(), fields, params, mode).await
    }

    pub async fn get_ad_sets(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD_SET, campaign::listing_checker(), fields, params, mode).await
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

    /// Starts an async insights report (`AdReportRun`).
    pub async fn get_insights_async(
        &self,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        ads_insights::insights_async(self, params, mode).await
    }

    pub async fn create_campaign(
        &self,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        create_on_edge(self, &CAMPAIGN, CAMPAIGN.update_checker(), params, mode).await
    }

    pub async fn create_ad(
        &self,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let checker = AD.checker(&[
            ("ad_schedule_end_time", "datetime"),
            ("ad_schedule_start_time", "datetime"),
            ("adlabels", "list<Object>"),
            ("adset_id", "unsigned int"),
            ("adset_spec", "AdSet"),
            ("bid_amount", "int"),
            ("creative", "AdCreative"),
            ("display_sequence", "unsigned int"),
            ("execution_options", "list<execution_options_enum>"),
            ("name", "string"),
            ("priority", "unsigned int"),
            ("source_ad_id", "string"),
            ("status", "status_enum"),
            ("tracking_specs", "Object"),
        ]);
        create_on_edge(self, &AD, checker, params, mode).await
    }

    /// Uploads a local video to this account's `advideos` edge in chunks.
    pub async fn upload_video(
        &self,
        path: impl AsRef<Path>,
        uploader: Option<VideoUploader>,
    ) -> GraphApiResult<Map<String, Value>> {
        let uploader = uploader.unwrap_or_else(|| VideoUploader::new(self.api().clone()));
        uploader.upload(&self.object().id_assured()?, path).await
    }
}
