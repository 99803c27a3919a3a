use http_transport::HttpMethod;
use serde_json::Value;

use crate::crud::{CallOutcome, CrudNode, RequestMode, dispatch};
use crate::errors::{GraphApiError, GraphApiResult};
use crate::object::{GraphObject, ObjectSpec};
use crate::params::Params;
use crate::parser::ObjectParser;
use crate::type_checker::ParamChecker;

use super::common::DATE_PRESETS;

const ACTION_ATTRIBUTION_WINDOWS: &[&str] = &[
    "1d_click",
    "1d_ev",
    "1d_view",
    "28d_click",
    "28d_view",
    "28d_view_all_conversions",
    "28d_view_first_conversion",
    "7d_click",
    "7d_view",
    "7d_view_all_conversions",
    "7d_view_first_conversion",
    "dda",
    "default",
    "skan_click",
    "skan_view",
];

const ACTION_BREAKDOWNS: &[&str] = &[
    "action_canvas_component_name",
    "action_carousel_card_id",
    "action_carousel_card_name",
    "action_destination",
    "action_device",
    "action_reaction",
    "action_target_id",
    "action_type",
    "action_video_sound",
    "action_video_type",
    "conversion_destination",
    "matched_persona_id",
];

const BREAKDOWNS: &[&str] = &[
    "age",
    "country",
    "device_platform",
    "dma",
    "gender",
    "hourly_stats_aggregated_by_advertiser_time_zone",
    "impression_device",
    "place_page_id",
    "platform_position",
    "product_id",
    "publisher_platform",
    "region",
];

pub static ADS_INSIGHTS: ObjectSpec = ObjectSpec {
    type_name: "AdsInsights",
    endpoint: Some("insights"),
    fields: &[
        "account_currency",
        "account_id",
        "account_name",
        "actions",
        "ad_id",
        "ad_name",
        "adset_id",
        "adset_name",
        "campaign_id",
        "campaign_name",
        "clicks",
        "cpc",
        "cpm",
        "ctr",
        "date_start",
        "date_stop",
        "frequency",
        "impressions",
        "objective",
        "reach",
        "spend",
    ],
    field_types: &[
        ("actions", "list<AdsActionStats>"),
        ("clicks", "string"),
        ("impressions", "string"),
        ("spend", "string"),
    ],
    enums: &[
        ("action_attribution_windows_enum", ACTION_ATTRIBUTION_WINDOWS),
        ("action_breakdowns_enum", ACTION_BREAKDOWNS),
        ("action_report_time_enum", &["conversion", "impression", "mixed"]),
        ("breakdowns_enum", BREAKDOWNS),
        ("date_preset_enum", DATE_PRESETS),
        ("level_enum", &["account", "ad", "adset", "campaign"]),
    ],
    ..ObjectSpec::ANY
};

/// Async insights job, polled by id.
pub static AD_REPORT_RUN: ObjectSpec = ObjectSpec {
    type_name: "AdReportRun",
    fields: &[
        "account_id",
        "async_percent_completion",
        "async_status",
        "date_start",
        "date_stop",
        "id",
        "time_completed",
        "time_ref",
    ],
    field_types: &[
        ("async_percent_completion", "int"),
        ("time_completed", "unsigned int"),
    ],
    ..ObjectSpec::ANY
};

/// Param types of the `insights` edge on every node that has one.
pub(crate) fn insights_checker() -> ParamChecker {
    ADS_INSIGHTS.checker(&[
        ("action_attribution_windows", "list<action_attribution_windows_enum>"),
        ("action_breakdowns", "list<action_breakdowns_enum>"),
        ("action_report_time", "action_report_time_enum"),
        ("breakdowns", "list<breakdowns_enum>"),
        ("date_preset", "date_preset_enum"),
        ("default_summary", "bool"),
        ("fields", "list<string>"),
        ("filtering", "list<Object>"),
        ("level", "level_enum"),
        ("sort", "list<string>"),
        ("summary", "list<string>"),
        ("time_increment", "string"),
        ("time_range", "map"),
        ("time_ranges", "list<map>"),
        ("use_account_attribution_setting", "bool"),
    ])
}

/// Starts an async insights job; the reply's `report_run_id` becomes the
/// job id.
pub(crate) async fn insights_async(
    node: &CrudNode,
    params: Params,
    mode: RequestMode<'_>,
) -> GraphApiResult<CallOutcome> {
    let parser = ObjectParser::custom(|body| {
        let Value::Object(mut data) = body.clone() else {
            return Err(GraphApiError::BadObject(format!(
                "unexpected async insights reply: {body}"
            )));
        };
        if let Some(run_id) = data.get("report_run_id").cloned() {
            data.insert("id".into(), run_id);
        }
        Ok(GraphObject::from_json(&AD_REPORT_RUN, &data))
    });

    let mut request = node
        .edge_request(HttpMethod::Post, &ADS_INSIGHTS, None)?
        .with_param_checker(insights_checker())
        .with_parser(parser)
        .with_summary(false);
    request.add_params(params);
    dispatch(request, mode).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insights_params_are_checked() {
        let checker = insights_checker();
        assert!(checker.is_valid_pair("date_preset", &json!("last_7d")));
        assert!(!checker.is_valid_pair("date_preset", &json!("last_8d")));
        assert!(checker.is_valid_pair("breakdowns", &json!(["age", "gender"])));
        assert!(!checker.is_valid_pair("level", &json!("account_group")));
        assert!(checker.is_valid_pair("time_range", &json!({"since": "2024-01-01"})));
    }
}
