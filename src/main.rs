mod common;
mod config;
mod image_store;
mod quantize_service;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::{Bytes, HttpBody},
    extract::{Path as UrlPath, Query, RawBody},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use handlebars::Handlebars;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{
    common::{generate_image_id, Error, ErrorResponse, Mode, OutputFormat},
    config::Config,
    image_store::ImageStore,
    quantize_service::{JobKey, QuantizeService, QuantizeServiceHandle},
};

#[derive(Serialize)]
struct IndexData {
    root: String,
    default_colors: usize,
    default_mode: &'static str,
    max_upload_size: usize,
    max_images: usize,
}

fn render_index(index_data: IndexData) -> String {
    const INDEX_HBS: &str = include_str!("index.hbs");
    let mut hbs = Handlebars::new();
    hbs.register_template_string("index_hbs", INDEX_HBS)
        .expect("error in index.hbs template");

    hbs.render("index_hbs", &index_data)
        .expect("cannot render index template")
}

struct State {
    /// The index containing documentation.
    index: String,
    max_upload_size: usize,

    images: ImageStore,
    quantize_service: QuantizeServiceHandle,
}

#[derive(Deserialize)]
struct QuantizeParams {
    colors: Option<usize>,
    mode: Option<Mode>,
    format: Option<OutputFormat>,
}

#[derive(Serialize)]
struct UploadedImage {
    id: String,
    width: u32,
    height: u32,
}

async fn index(state: Arc<State>) -> Html<String> {
    Html(state.index.clone())
}

/// Buffers an upload, refusing it as soon as it is known to exceed `limit`: up front when the
/// client declares a larger `Content-Length`, otherwise once the received chunks add up past it.
async fn read_upload<B>(limit: usize, headers: &HeaderMap, mut body: B) -> Result<Bytes, Error>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<axum::BoxError>,
{
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.map_or(false, |length| length > limit) {
        return Err(Error::UploadTooLarge { limit });
    }

    let mut buffer = Vec::with_capacity(declared.unwrap_or(0));
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|e| Error::UploadInterrupted(e.into()))?;
        if buffer.len() + chunk.len() > limit {
            return Err(Error::UploadTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.into())
}

async fn decode_upload<B>(state: &State, headers: &HeaderMap, body: B) -> Result<RgbImage, Error>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<axum::BoxError>,
{
    let body = read_upload(state.max_upload_size, headers, body).await?;
    let image = tokio::task::spawn_blocking(move || mediancut::decode(&body))
        .await
        .map_err(|_| Error::JobPanicked)??;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        "decoded upload"
    );
    Ok(image)
}

async fn respond_quantized(
    state: &State,
    image_id: String,
    image: Arc<RgbImage>,
    params: QuantizeParams,
) -> Result<Response, ErrorResponse> {
    let defaults = state.quantize_service.config();
    let key = JobKey {
        image_id,
        colors: params.colors.unwrap_or(defaults.default_colors),
        mode: params.mode.unwrap_or(defaults.default_mode),
        format: params.format.unwrap_or_default(),
    };
    tracing::debug!(?key, "serving quantized image");

    let content_type = key.format.content_type();
    let bytes = state
        .quantize_service
        .quantize(key, image)
        .await
        .map_err(|e| e.to_response())?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

async fn quantize_upload(
    state: Arc<State>,
    Query(params): Query<QuantizeParams>,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> Result<Response, ErrorResponse> {
    let image = decode_upload(&state, &headers, body)
        .await
        .map_err(|e| e.to_response())?;
    // One-off uploads get a fresh ID so that they never share a job with anything else.
    let image_id = generate_image_id(32);
    respond_quantized(&state, image_id, Arc::new(image), params).await
}

async fn upload_image(
    state: Arc<State>,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> Result<(StatusCode, Json<UploadedImage>), ErrorResponse> {
    let image = decode_upload(&state, &headers, body)
        .await
        .map_err(|e| e.to_response())?;
    let (width, height) = image.dimensions();
    let id = state.images.insert(image);
    tracing::info!(%id, width, height, stored = state.images.len(), "stored upload");

    Ok((StatusCode::CREATED, Json(UploadedImage { id, width, height })))
}

async fn quantize_stored(
    state: Arc<State>,
    UrlPath(id): UrlPath<String>,
    Query(params): Query<QuantizeParams>,
) -> Result<Response, ErrorResponse> {
    let image = state
        .images
        .get(&id)
        .ok_or_else(|| Error::ImageNotFound(id.clone()).to_response())?;
    respond_quantized(&state, id, image, params).await
}

async fn delete_image(
    state: Arc<State>,
    UrlPath(id): UrlPath<String>,
) -> Result<StatusCode, ErrorResponse> {
    if state.images.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::ImageNotFound(id).to_response())
    }
}

fn router(state: Arc<State>) -> Router {
    Router::new()
        .route(
            "/",
            get({
                let state = Arc::clone(&state);
                move || index(state)
            }),
        )
        .route(
            "/quantize",
            post({
                let state = Arc::clone(&state);
                move |params, headers, body| quantize_upload(state, params, headers, body)
            }),
        )
        .route(
            "/images",
            post({
                let state = Arc::clone(&state);
                move |headers, body| upload_image(state, headers, body)
            }),
        )
        .route(
            "/images/:id",
            delete({
                let state = Arc::clone(&state);
                move |id| delete_image(state, id)
            }),
        )
        .route(
            "/images/:id/quantize",
            get({
                let state = Arc::clone(&state);
                move |id, params| quantize_stored(state, id, params)
            }),
        )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    tracing::debug!("loading config from {}", config::PATH);
    let config = std::fs::read_to_string(config::PATH).expect("failed to load config file");
    let config: Config = toml::from_str(&config).expect("config TOML deserialization error");

    let index_page = render_index(IndexData {
        root: config.server.root.clone(),
        default_colors: config.quantize_service.default_colors,
        default_mode: config.quantize_service.default_mode.as_str(),
        max_upload_size: config.server.max_upload_size,
        max_images: config.image_store.max_images,
    });

    let state = Arc::new(State {
        index: index_page,
        max_upload_size: config.server.max_upload_size,
        images: ImageStore::new(config.image_store),
        quantize_service: QuantizeService::spawn(config.quantize_service),
    });

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("failed to start server");
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::HeaderValue};
    use image::Rgb;
    use mediancut::{MappingMode, Quantizer};

    use super::*;
    use crate::{
        image_store::ImageStoreConfig,
        quantize_service::QuantizeServiceConfig,
    };

    fn state(max_upload_size: usize) -> Arc<State> {
        Arc::new(State {
            index: String::new(),
            max_upload_size,
            images: ImageStore::new(ImageStoreConfig { max_images: 4 }),
            quantize_service: QuantizeService::spawn(QuantizeServiceConfig {
                max_jobs: 1,
                default_colors: 16,
                default_mode: Mode::Fast,
            }),
        })
    }

    fn png_upload() -> Vec<u8> {
        let image = RgbImage::from_fn(8, 8, |x, y| Rgb([(x * 32) as u8, (y * 32) as u8, 0]));
        let paletted = Quantizer::new(16, MappingMode::Fast)
            .unwrap()
            .quantize(&image)
            .unwrap();
        mediancut::encode_png(&paletted).unwrap()
    }

    fn content_length(length: usize) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        headers
    }

    #[tokio::test]
    async fn declared_oversized_upload_is_refused() {
        let state = state(64);
        let body = Body::from(vec![0; 1024]);
        let Err((status, _)) =
            upload_image(Arc::clone(&state), content_length(1024), RawBody(body)).await
        else {
            panic!("oversized upload was accepted");
        };
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(state.images.len(), 0);
    }

    #[tokio::test]
    async fn undeclared_oversized_upload_is_refused() {
        let state = state(64);
        let body = Body::from(vec![0; 1024]);
        let params = QuantizeParams {
            colors: None,
            mode: None,
            format: None,
        };
        let Err((status, _)) =
            quantize_upload(state, Query(params), HeaderMap::new(), RawBody(body)).await
        else {
            panic!("oversized upload was accepted");
        };
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn upload_within_limit_is_stored() {
        let bytes = png_upload();
        let state = state(bytes.len());
        let headers = content_length(bytes.len());
        let Ok((status, Json(uploaded))) =
            upload_image(Arc::clone(&state), headers, RawBody(Body::from(bytes))).await
        else {
            panic!("upload within the limit was refused");
        };
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!((uploaded.width, uploaded.height), (8, 8));
        assert!(state.images.get(&uploaded.id).is_some());
    }

    #[tokio::test]
    async fn read_upload_stops_at_limit() {
        let body = Body::from(vec![1; 10]);
        let bytes = read_upload(10, &HeaderMap::new(), body).await.unwrap();
        assert_eq!(bytes.len(), 10);

        let body = Body::from(vec![1; 11]);
        assert!(matches!(
            read_upload(10, &HeaderMap::new(), body).await,
            Err(Error::UploadTooLarge { limit: 10 })
        ));
    }
}
