use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{Pagination, RankingQuery};

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub message: &'static str,
    pub video_id: Uuid,
    pub votes: i32,
}

/// GET /api/public/videos
pub async fn list_public(
    state: web::Data<AppState>,
    query: web::Query<Pagination>,
) -> Result<HttpResponse> {
    let items = state.ranking.public_videos(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// POST /api/public/videos/{video_id}/vote
pub async fn vote(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    let votes = state.votes.vote(user.0, video_id).await?;

    Ok(HttpResponse::Ok().json(VoteResponse {
        message: "Vote registered successfully",
        video_id,
        votes,
    }))
}

/// GET /api/public/rankings
pub async fn rankings(
    state: web::Data<AppState>,
    query: web::Query<RankingQuery>,
) -> Result<HttpResponse> {
    let items = state.ranking.rankings(&query).await?;
    Ok(HttpResponse::Ok().json(items))
}
