use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::parse_country_list;
use crate::location::timezone::utc_offset_label;
use crate::location::{
    Coordinate, LocationError, LocationSelection, MapClick, PlaceCandidate, ResolvedLocation,
};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<LocationError> for ApiError {
    fn from(e: LocationError) -> Self {
        let status = match e {
            LocationError::NoResult(_) => StatusCode::NOT_FOUND,
            LocationError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
            LocationError::Provider(_) => StatusCode::BAD_GATEWAY,
        };
        api_error(status, e.to_string())
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ─── GET /api/status ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub provider: String,
    pub available: bool,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        provider: state.resolver.provider_name().to_string(),
        available: state.resolver.is_available(),
    })
}

// ─── GET /api/autocomplete ───────────────────────────────────────

#[derive(Deserialize)]
pub struct AutocompleteQuery {
    pub q: Option<String>,
    /// Comma-separated ISO codes; overrides the configured allow-list.
    pub countries: Option<String>,
}

pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AutocompleteQuery>,
) -> Json<Vec<PlaceCandidate>> {
    let start = Instant::now();
    let query = params.q.as_deref().unwrap_or("");

    let candidates = match params.countries.as_deref().map(parse_country_list) {
        Some(countries) if !countries.is_empty() => {
            state.resolver.autocomplete_in(query, Some(countries.as_slice())).await
        }
        _ => state.resolver.autocomplete(query).await,
    };

    info!(
        query,
        results = candidates.len(),
        elapsed_ms = elapsed_ms(start),
        "GET /api/autocomplete"
    );
    Json(candidates)
}

// ─── GET /api/select ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SelectQuery {
    pub id: Option<String>,
    pub description: Option<String>,
}

pub async fn select(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectQuery>,
) -> Result<Json<LocationSelection>, ApiError> {
    let start = Instant::now();
    let id = params.id.as_deref().unwrap_or("").trim();
    if id.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'id' parameter"));
    }

    let description = params.description.unwrap_or_default();
    let candidate = PlaceCandidate {
        id: id.to_string(),
        main_text: description.split(',').next().unwrap_or("").trim().to_string(),
        description,
        secondary_text: String::new(),
    };
    let selection = state.resolver.select_candidate(&candidate).await;

    info!(
        place_id = id,
        name = %selection.display_name,
        elapsed_ms = elapsed_ms(start),
        "GET /api/select"
    );
    Ok(Json(selection))
}

// ─── GET /api/click ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ClickQuery {
    pub lat: f64,
    pub lng: f64,
    pub place_id: Option<String>,
}

pub async fn click(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClickQuery>,
) -> Result<Json<ResolvedLocation>, ApiError> {
    let start = Instant::now();
    let coordinate = Coordinate::checked(params.lat, params.lng)?;
    let click = match params.place_id.filter(|id| !id.trim().is_empty()) {
        Some(place_id) => MapClick::on_place(coordinate, place_id),
        None => MapClick::at(coordinate),
    };

    let resolved = state.resolver.resolve_click(&click).await?;

    info!(
        lat = params.lat,
        lng = params.lng,
        name = %resolved.display_name,
        source = %resolved.source,
        elapsed_ms = elapsed_ms(start),
        "GET /api/click"
    );
    Ok(Json(resolved))
}

// ─── GET /api/timezone ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct CoordinateQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize)]
pub struct TimezoneResponse {
    pub timezone: String,
    pub utc_offset: Option<String>,
}

pub async fn timezone(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CoordinateQuery>,
) -> Result<Json<TimezoneResponse>, ApiError> {
    let coordinate = Coordinate::checked(params.lat, params.lng)?;
    let timezone = state.resolver.timezone(coordinate).await;
    Ok(Json(TimezoneResponse {
        utc_offset: utc_offset_label(&timezone),
        timezone,
    }))
}

// ─── GET /api/format ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FormatQuery {
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct FormatResponse {
    pub display_name: String,
}

pub async fn format_address(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FormatQuery>,
) -> Json<FormatResponse> {
    let address = params.address.unwrap_or_default();
    Json(FormatResponse {
        display_name: state.resolver.format_address(&address),
    })
}

// ─── GET /api/typed ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TypedQuery {
    pub text: Option<String>,
}

pub async fn typed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TypedQuery>,
) -> Result<Json<LocationSelection>, ApiError> {
    state
        .resolver
        .resolve_typed(params.text.as_deref().unwrap_or(""))
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'text' parameter"))
}

#[cfg(test)]
mod tests {
    use crate::config::LocatorConfig;
    use crate::location::testing::{candidate, details, nearby, FakeProvider};
    use crate::location::LocationResolver;
    use crate::server::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(provider: FakeProvider) -> axum::Router {
        build_router(LocationResolver::new(Arc::new(provider), &LocatorConfig::default()))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value, Option<String>) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let cache = resp
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body, cache)
    }

    #[tokio::test]
    async fn test_status() {
        let (status, body, cache) = get(router(FakeProvider::new()), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "fake");
        assert_eq!(body["available"], true);
        assert_eq!(cache.as_deref(), Some("no-store"));
    }

    #[tokio::test]
    async fn test_autocomplete() {
        let provider = FakeProvider::new().with_autocomplete(
            "monas",
            Duration::ZERO,
            vec![candidate("m1", "Monumen Nasional, Jakarta")],
        );
        let (status, body, _) = get(router(provider), "/api/autocomplete?q=monas").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "m1");
        assert_eq!(body[0]["main_text"], "Monumen Nasional");

        let (_, body, _) = get(router(FakeProvider::new()), "/api/autocomplete").await;
        assert_eq!(body, Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_select_degrades_to_description() {
        let (status, body, _) = get(
            router(FakeProvider::new()),
            "/api/select?id=missing&description=Kota%20Tua%2C%20Jakarta",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Kota Tua, Jakarta");
        assert!(body.get("coordinate").is_none());

        let (status, _, _) = get(router(FakeProvider::new()), "/api/select").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_click_resolves_poi() {
        let provider = FakeProvider::new()
            .with_nearby(vec![nearby("ui", "UI", &["university"], -6.3606, 106.8272)])
            .with_details("ui", Ok(details("Universitas Indonesia", -6.3606, 106.8272)));
        let (status, body, _) = get(router(provider), "/api/click?lat=-6.3610&lng=106.8280").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Universitas Indonesia");
        assert_eq!(body["source"], "map_poi");
        assert_eq!(body["timezone"], "Asia/Jakarta");
    }

    #[tokio::test]
    async fn test_click_errors() {
        let (status, body, _) = get(router(FakeProvider::new()), "/api/click?lat=-6.2&lng=106.8").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);

        let (status, _, _) = get(router(FakeProvider::new()), "/api/click?lat=95&lng=106.8").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_timezone() {
        let provider = FakeProvider::new().with_timezone(Ok("Asia/Makassar".into()));
        let (status, body, _) = get(router(provider), "/api/timezone?lat=-8.65&lng=115.22").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timezone"], "Asia/Makassar");
        assert_eq!(body["utc_offset"], "UTC+08:00");
    }

    #[tokio::test]
    async fn test_format_and_typed() {
        let (_, body, _) = get(
            router(FakeProvider::new()),
            "/api/format?address=AB12%2B34%2C%20Kecamatan%20Cengkareng%2C%20Jakarta%2C%20Indonesia",
        )
        .await;
        assert_eq!(body["display_name"], "Cengkareng, Jakarta");

        let (status, body, _) = get(router(FakeProvider::new()), "/api/typed?text=Ubud%2C%20Bali").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timezone"], "Asia/Makassar");

        let (status, _, _) = get(router(FakeProvider::new()), "/api/typed?text=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
