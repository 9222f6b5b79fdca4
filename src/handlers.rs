use crate::{
    AppState,
    auth::{Claims, issue_token},
    error::ApiError,
    models::{
        Attachment, CreateProjectRequest, LikeResponse, LoginRequest, LoginResponse,
        ProjectSummary, PublishRequest, PublishResponse, Record, fields, tables,
    },
    resolver::{ensure_linked_records, fetch_linked_names},
    store::{Fields, Formula, RecordStore, StoreError},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

// --- Shared Resolution ---

/// Collects the distinct linked-record ids a field holds across a record set,
/// in first-seen order.
fn collect_linked_ids(records: &[Record], field: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        for id in record.id_list_field(field) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
    }
    seen
}

/// resolve_summaries
///
/// Builds listing items from raw project records. Names are fetched once per
/// linked table for the whole record set, and every summary reads from those
/// two maps; an id the lookup misses falls back to the raw id.
async fn resolve_summaries(
    store: &dyn RecordStore,
    records: &[Record],
    with_publish_flag: bool,
) -> Result<Vec<ProjectSummary>, StoreError> {
    let student_ids = collect_linked_ids(records, fields::STUDENTS);
    let technology_ids = collect_linked_ids(records, fields::TECHNOLOGIES);

    let student_names =
        fetch_linked_names(store, tables::STUDENTS, &student_ids, fields::NAME).await?;
    let technology_names =
        fetch_linked_names(store, tables::TECHNOLOGIES, &technology_ids, fields::NAME).await?;

    Ok(records
        .iter()
        .map(|record| ProjectSummary {
            id: record.id.clone(),
            title: record.str_field(fields::TITLE).to_string(),
            description: record.str_field(fields::DESCRIPTION).to_string(),
            image: record.first_attachment_url(fields::IMAGES),
            students: record
                .id_list_field(fields::STUDENTS)
                .into_iter()
                .map(|id| student_names.get(&id).cloned().unwrap_or(id))
                .collect(),
            technologies: record
                .id_list_field(fields::TECHNOLOGIES)
                .into_iter()
                .map(|id| technology_names.get(&id).cloned().unwrap_or(id))
                .collect(),
            likes: record.u64_field(fields::LIKES),
            published: with_publish_flag.then(|| record.bool_field(fields::PUBLISHED)),
        })
        .collect())
}

// --- Public Handlers ---

/// list_projects
///
/// [Public Route] Lists published projects with linked ids resolved to display
/// names. The publish filter is applied unconditionally at the store query, so
/// there is no anonymous path to unpublished records.
#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "Published projects", body = [ProjectSummary]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let records = state
        .store
        .select(tables::PROJECTS, Some(Formula::checked(fields::PUBLISHED)), None)
        .await?;
    let summaries = resolve_summaries(&*state.store, &records, false).await?;
    Ok(Json(summaries))
}

/// get_project
///
/// [Public Route] Retrieves a single project as a raw record, publish flag and
/// linked ids included. 404 when the id does not resolve.
#[utoipa::path(
    get,
    path = "/projects/{id}",
    params(("id" = String, Path, description = "Project record id")),
    responses(
        (status = 200, description = "Found", body = Record),
        (status = 404, description = "No such project")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    match state.store.find(tables::PROJECTS, &id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound("project not found".to_string())),
    }
}

/// like_project
///
/// [Public Route] Increments a project's like counter and returns the new
/// value. The counter only ever goes up; a missing counter field reads as 0.
#[utoipa::path(
    post,
    path = "/projects/{id}/like",
    params(("id" = String, Path, description = "Project record id")),
    responses(
        (status = 200, description = "Liked", body = LikeResponse),
        (status = 404, description = "No such project")
    )
)]
pub async fn like_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>, ApiError> {
    // The store has no conditional update, so the read-modify-write is
    // serialized within this process. Concurrent likers queue here instead of
    // overwriting each other's increments.
    let _guard = state.like_lock.lock().await;

    let record = state
        .store
        .find(tables::PROJECTS, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;

    let mut update = Fields::new();
    update.insert(
        fields::LIKES.to_string(),
        json!(record.u64_field(fields::LIKES) + 1),
    );
    let updated = state.store.update(tables::PROJECTS, &record.id, update).await?;

    let likes = updated.u64_field(fields::LIKES);
    Ok(Json(LikeResponse {
        id: updated.id,
        likes,
    }))
}

// --- Auth Handlers ---

/// login
///
/// [Public Route] Validates credentials against the Users table and issues a
/// one-hour bearer token. Email matching is case-insensitive; the password is
/// checked against the stored bcrypt hash. Unknown users and bad passwords both
/// answer 401, with distinct messages.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let filter = Formula::lower_eq(fields::EMAIL, &payload.email);
    let users = state.store.select(tables::USERS, Some(filter), Some(1)).await?;
    let user = users
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))?;

    // A user record without a hash is store corruption, not a credential failure.
    let hash = user
        .fields
        .get(fields::PASSWORD_HASH)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Upstream("user record has no password hash".to_string()))?;

    let password_ok =
        bcrypt::verify(&payload.password, hash).map_err(|e| ApiError::Upstream(e.to_string()))?;
    if !password_ok {
        return Err(ApiError::Unauthorized("invalid password".to_string()));
    }

    let role = user.str_field(fields::ROLE).to_string();
    let claims = Claims::new(user.id, payload.email, role);
    let token = issue_token(&claims, &state.config.jwt_secret)
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(LoginResponse {
        access_token: token,
    }))
}

// --- Admin Handlers (behind the guard) ---

/// admin_list_projects
///
/// [Admin Route] Same shape as the public listing, but covers every record and
/// carries the publish flag per item.
#[utoipa::path(
    get,
    path = "/admin/projects",
    responses((status = 200, description = "All projects", body = [ProjectSummary]))
)]
pub async fn admin_list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let records = state.store.select(tables::PROJECTS, None, None).await?;
    let summaries = resolve_summaries(&*state.store, &records, true).await?;
    Ok(Json(summaries))
}

/// set_publish_state
///
/// [Admin Route] Publishes or unpublishes a project. The body's `publish` field
/// is typed as a boolean, so anything else is rejected before the store is
/// touched.
#[utoipa::path(
    patch,
    path = "/admin/projects/{id}/publish",
    params(("id" = String, Path, description = "Project record id")),
    request_body = PublishRequest,
    responses((status = 200, description = "Updated", body = PublishResponse))
)]
pub async fn set_publish_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, ApiError> {
    let mut update = Fields::new();
    update.insert(fields::PUBLISHED.to_string(), Value::Bool(payload.publish));
    let updated = state.store.update(tables::PROJECTS, &id, update).await?;

    let published = updated.bool_field(fields::PUBLISHED);
    Ok(Json(PublishResponse {
        id: updated.id,
        published,
    }))
}

/// create_project
///
/// [Admin Route] Creates a project from display-name input. Students and
/// technologies are resolved to linked ids first, creating lookup records for
/// names the tables do not hold yet. New projects start unpublished with zero
/// likes.
#[utoipa::path(
    post,
    path = "/admin/projects",
    request_body = CreateProjectRequest,
    responses((status = 201, description = "Created", body = Record))
)]
pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let student_ids =
        ensure_linked_records(&*state.store, tables::STUDENTS, &payload.students, fields::NAME)
            .await?;
    let technology_ids = ensure_linked_records(
        &*state.store,
        tables::TECHNOLOGIES,
        &payload.technologies,
        fields::NAME,
    )
    .await?;

    let attachments: Vec<Attachment> = payload
        .images
        .into_iter()
        .map(|url| Attachment { url })
        .collect();

    let mut project = Fields::new();
    project.insert(fields::TITLE.to_string(), Value::String(payload.title));
    project.insert(
        fields::DESCRIPTION.to_string(),
        Value::String(payload.description),
    );
    project.insert(fields::IMAGES.to_string(), json!(attachments));
    project.insert(fields::STUDENTS.to_string(), json!(student_ids));
    project.insert(fields::TECHNOLOGIES.to_string(), json!(technology_ids));
    // New submissions wait for an explicit publish.
    project.insert(fields::PUBLISHED.to_string(), Value::Bool(false));
    project.insert(fields::LIKES.to_string(), json!(0));

    let created = state
        .store
        .create(tables::PROJECTS, vec![project])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Upstream("store returned no created record".to_string()))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// delete_project
///
/// [Admin Route] Deletes a project record. 204 on success; a miss surfaces as
/// the store's own error, not as a 404.
#[utoipa::path(
    delete,
    path = "/admin/projects/{id}",
    params(("id" = String, Path, description = "Project record id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 500, description = "Store rejected the delete")
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.destroy(tables::PROJECTS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
