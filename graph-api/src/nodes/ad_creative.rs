use crate::crud::{CallOutcome, RequestMode};
use crate::errors::GraphApiResult;
use crate::object::ObjectSpec;
use crate::params::Params;
use crate::type_checker::ParamChecker;

use super::ad::AD;
use super::read_edge;

pub static AD_CREATIVE: ObjectSpec = ObjectSpec {
    type_name: "AdCreative",
    endpoint: Some("adcreatives"),
    fields: &[
        "account_id",
        "actor_id",
        "adlabels",
        "asset_feed_spec",
        "body",
        "call_to_action_type",
        "effective_object_story_id",
        "id",
        "image_hash",
        "image_url",
        "link_url",
        "name",
        "object_id",
        "object_story_id",
        "object_story_spec",
        "object_type",
        "object_url",
        "product_set_id",
        "status",
        "thumbnail_id",
        "thumbnail_url",
        "title",
        "url_tags",
        "video_id",
        "call_to_action",
        "image_file",
    ],
    field_types: &[
        ("adlabels", "list<AdLabel>"),
        ("object_story_spec", "AdCreativeObjectStorySpec"),
        ("image_file", "string"),
    ],
    read_params: &[("thumbnail_height", "unsigned int"), ("thumbnail_width", "unsigned int")],
    update_params: &[
        ("account_id", "string"),
        ("adlabels", "list<Object>"),
        ("name", "string"),
        ("status", "status_enum"),
    ],
    enums: &[("status_enum", &["ACTIVE", "DELETED", "IN_PROCESS", "WITH_ISSUES"])],
    ..ObjectSpec::ANY
};

node_type!(
    /// Creative content (copy, media, call to action) shared by ads.
    AdCreative,
    AD_CREATIVE
);

impl AdCreative {
    /// Ads that use this creative.
    pub async fn get_ads(
        &self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        read_edge(self, &AD, ParamChecker::empty(), fields, params, mode).await
    }
}
