use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::catalog::CourseFilter;
use crate::error::AcademyError;
use crate::integrations::{
    CommunityInfo, ConnectReq, ConnectionReceipt, IntegrationStatus, MessageReceipt, MessageReq,
    Platform, Playlist, PlaylistDetails,
};
use crate::models::*;
use crate::state::AppState;
use crate::video::{Provider, ProviderInfo, Quality, QualityOption, VideoMetadata};

type ApiResult<T> = Result<Json<T>, AcademyError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        // catalog + enrollment
        .route("/api/courses", get(list_courses))
        .route("/api/courses/:course_id", get(course_details))
        .route("/api/courses/:course_id/resources", get(course_resources))
        .route("/api/courses/:course_id/enroll", post(enroll))
        // progress
        .route("/api/progress/:user_id/:course_id", get(get_progress))
        .route("/api/progress/:user_id/:course_id/lessons/:lesson_id", post(record_lesson))
        .route("/api/progress/:user_id/:course_id/reset", post(reset_progress))
        .route("/api/progress/:user_id/:course_id/certificate", post(issue_certificate))
        // identity + access
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me).patch(update_me))
        .route("/api/access/:content_type", get(check_access))
        // billing
        .route("/api/plans", get(list_plans))
        .route("/api/plans/:plan_id", get(get_plan))
        .route("/api/payment-methods", get(payment_methods))
        .route("/api/payments/validate", post(validate_payment))
        .route("/api/subscriptions", post(subscribe))
        .route("/api/subscriptions/:id", axum::routing::put(change_plan).delete(cancel))
        .route("/api/users/:user_id/subscription", get(user_subscription))
        .route("/api/users/:user_id/invoices", get(user_invoices))
        .route("/api/invoices/:invoice_id/pdf", get(invoice_pdf))
        // integrations
        .route("/api/integrations", get(integration_status))
        .route("/api/integrations/spotify/playlists", get(spotify_playlists))
        .route("/api/integrations/spotify/playlists/:playlist_id", get(spotify_playlist))
        .route("/api/integrations/telegram/channel", get(telegram_channel))
        .route("/api/integrations/whatsapp/group", get(whatsapp_group))
        .route("/api/integrations/:platform/connect", post(connect_integration))
        .route("/api/integrations/:platform/disconnect", post(disconnect_integration))
        .route("/api/integrations/:platform/messages", post(send_message))
        // video
        .route("/api/videos/providers", get(video_providers).put(set_video_provider))
        .route("/api/videos/qualities", get(video_qualities))
        .route("/api/videos/recommended-quality", get(recommended_quality))
        .route("/api/videos/:video_id", get(video_metadata))
        .route("/api/videos/:video_id/stream", get(video_stream))
        .route("/api/videos/:video_id/thumbnail", get(video_thumbnail))
        .with_state(state)
}

// --- catalog ---

async fn list_courses(
    State(st): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> ApiResult<Vec<Course>> {
    Ok(Json(st.catalog.list_courses(&filter).await?))
}

async fn course_details(State(st): State<AppState>, Path(course_id): Path<String>) -> ApiResult<Course> {
    Ok(Json(st.catalog.course_details(&course_id).await?))
}

async fn course_resources(
    State(st): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Vec<CourseResource>> {
    Ok(Json(st.catalog.course_resources(&course_id).await?))
}

async fn enroll(
    State(st): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<EnrollReq>,
) -> ApiResult<Enrollment> {
    Ok(Json(st.progress.enroll(&req.user_id, &course_id).await?))
}

// --- progress ---

async fn get_progress(
    State(st): State<AppState>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> ApiResult<ProgressRecord> {
    Ok(Json(st.progress.get_progress(&user_id, &course_id).await?))
}

async fn record_lesson(
    State(st): State<AppState>,
    Path((user_id, course_id, lesson_id)): Path<(String, String, String)>,
    Json(event): Json<LessonEvent>,
) -> ApiResult<ProgressRecord> {
    let record = st
        .progress
        .record_lesson_event(&user_id, &course_id, &lesson_id, event)
        .await?;
    Ok(Json(record))
}

async fn reset_progress(
    State(st): State<AppState>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> ApiResult<ProgressRecord> {
    Ok(Json(st.progress.reset_progress(&user_id, &course_id).await?))
}

async fn issue_certificate(
    State(st): State<AppState>,
    Path((user_id, course_id)): Path<(String, String)>,
) -> ApiResult<ProgressRecord> {
    Ok(Json(st.progress.issue_certificate(&user_id, &course_id).await?))
}

// --- identity + access ---

async fn register(State(st): State<AppState>, Json(req): Json<RegisterReq>) -> ApiResult<User> {
    Ok(Json(st.auth.register(&req.email, &req.password, &req.name).await?))
}

async fn login(State(st): State<AppState>, Json(req): Json<LoginReq>) -> ApiResult<User> {
    Ok(Json(st.auth.login(&req.email, &req.password).await?))
}

async fn logout(State(st): State<AppState>) -> ApiResult<serde_json::Value> {
    st.auth.logout().await?;
    Ok(Json(json!({ "ok": true })))
}

async fn me(State(st): State<AppState>) -> ApiResult<User> {
    st.auth
        .current_user()
        .await
        .map(Json)
        .ok_or_else(|| AcademyError::Unauthorized("no active session".into()))
}

async fn update_me(State(st): State<AppState>, Json(patch): Json<UserPatch>) -> ApiResult<User> {
    Ok(Json(st.auth.update_profile(patch).await?))
}

async fn check_access(
    State(st): State<AppState>,
    Path(content): Path<ContentClass>,
) -> ApiResult<serde_json::Value> {
    let allowed = st.auth.has_access(content).await;
    Ok(Json(json!({ "content_type": content, "allowed": allowed })))
}

// --- billing ---

async fn list_plans(State(st): State<AppState>) -> ApiResult<Vec<Plan>> {
    Ok(Json(st.billing.plans().to_vec()))
}

async fn get_plan(State(st): State<AppState>, Path(plan_id): Path<String>) -> ApiResult<Plan> {
    Ok(Json(st.billing.plan(&plan_id)?.clone()))
}

async fn payment_methods(State(st): State<AppState>) -> ApiResult<Vec<PaymentMethod>> {
    Ok(Json(st.billing.payment_methods()))
}

async fn validate_payment(
    State(st): State<AppState>,
    Json(details): Json<PaymentDetails>,
) -> ApiResult<serde_json::Value> {
    st.billing.validate_payment_details(&details)?;
    Ok(Json(json!({ "valid": true })))
}

async fn subscribe(
    State(st): State<AppState>,
    Json(req): Json<SubscribeReq>,
) -> ApiResult<SubscriptionReceipt> {
    let receipt = st
        .billing
        .process_subscription(&req.user_id, &req.plan_id, &req.payment)
        .await?;
    Ok(Json(receipt))
}

async fn change_plan(
    State(st): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChangePlanReq>,
) -> ApiResult<PlanChange> {
    Ok(Json(st.billing.update_subscription(&id, &req.plan_id).await?))
}

async fn cancel(
    State(st): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<CancelReq>>,
) -> ApiResult<Cancellation> {
    let reason = body.and_then(|Json(req)| req.reason);
    Ok(Json(st.billing.cancel_subscription(&id, reason).await?))
}

async fn user_subscription(
    State(st): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Subscription> {
    Ok(Json(st.billing.user_subscription(&user_id).await?))
}

async fn user_invoices(State(st): State<AppState>, Path(user_id): Path<String>) -> ApiResult<Vec<Invoice>> {
    Ok(Json(st.billing.payment_history(&user_id).await))
}

async fn invoice_pdf(State(st): State<AppState>, Path(invoice_id): Path<String>) -> ApiResult<InvoicePdf> {
    Ok(Json(st.billing.invoice_pdf(&invoice_id).await?))
}

// --- integrations ---

async fn integration_status(State(st): State<AppState>) -> ApiResult<BTreeMap<Platform, IntegrationStatus>> {
    Ok(Json(st.integrations.status().await))
}

async fn connect_integration(
    State(st): State<AppState>,
    Path(platform): Path<String>,
    body: Option<Json<ConnectReq>>,
) -> ApiResult<ConnectionReceipt> {
    let platform: Platform = platform.parse()?;
    let credential = body.and_then(|Json(req)| req.credential);
    Ok(Json(st.integrations.connect(platform, credential).await?))
}

async fn disconnect_integration(
    State(st): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<serde_json::Value> {
    let platform: Platform = platform.parse()?;
    st.integrations.disconnect(platform).await?;
    Ok(Json(json!({ "ok": true, "message": format!("{platform} disconnected successfully") })))
}

async fn spotify_playlists(State(st): State<AppState>) -> ApiResult<Vec<Playlist>> {
    Ok(Json(st.integrations.spotify_playlists().await?))
}

async fn spotify_playlist(
    State(st): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<PlaylistDetails> {
    Ok(Json(st.integrations.spotify_playlist(&playlist_id).await?))
}

async fn telegram_channel(State(st): State<AppState>) -> ApiResult<CommunityInfo> {
    Ok(Json(st.integrations.telegram_channel().await?))
}

async fn whatsapp_group(State(st): State<AppState>) -> ApiResult<CommunityInfo> {
    Ok(Json(st.integrations.whatsapp_group().await?))
}

async fn send_message(
    State(st): State<AppState>,
    Path(platform): Path<String>,
    Json(req): Json<MessageReq>,
) -> ApiResult<MessageReceipt> {
    let platform: Platform = platform.parse()?;
    Ok(Json(st.integrations.send_message(platform, &req.text).await?))
}

// --- video ---

#[derive(Deserialize)]
struct StreamQuery {
    quality: Option<Quality>,
    provider: Option<Provider>,
}

#[derive(Deserialize)]
struct ThumbnailQuery {
    t: Option<u32>,
}

#[derive(Deserialize)]
struct SpeedQuery {
    kbps: u32,
}

#[derive(Deserialize)]
struct ProviderReq {
    provider: String,
}

async fn video_providers(State(st): State<AppState>) -> ApiResult<Vec<ProviderInfo>> {
    Ok(Json(st.video.providers().await))
}

async fn set_video_provider(
    State(st): State<AppState>,
    Json(req): Json<ProviderReq>,
) -> ApiResult<serde_json::Value> {
    let provider = st.video.set_provider(&req.provider).await?;
    Ok(Json(json!({ "provider": provider })))
}

async fn video_qualities(State(st): State<AppState>) -> ApiResult<Vec<QualityOption>> {
    Ok(Json(st.video.quality_options()))
}

async fn recommended_quality(Query(q): Query<SpeedQuery>) -> ApiResult<serde_json::Value> {
    Ok(Json(json!({ "quality": Quality::for_connection(q.kbps) })))
}

async fn video_metadata(State(st): State<AppState>, Path(video_id): Path<String>) -> ApiResult<VideoMetadata> {
    Ok(Json(st.video.metadata(&video_id).await?))
}

async fn video_stream(
    State(st): State<AppState>,
    Path(video_id): Path<String>,
    Query(q): Query<StreamQuery>,
) -> ApiResult<serde_json::Value> {
    let url = st.video.stream_url(&video_id, q.quality, q.provider).await;
    Ok(Json(json!({ "url": url })))
}

async fn video_thumbnail(
    State(st): State<AppState>,
    Path(video_id): Path<String>,
    Query(q): Query<ThumbnailQuery>,
) -> ApiResult<serde_json::Value> {
    Ok(Json(json!({ "url": st.video.thumbnail_url(&video_id, q.t) })))
}
