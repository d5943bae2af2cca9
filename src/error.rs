/// 서비스 공통 에러
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
    #[error("상품을 찾을 수 없습니다: {0}")]
    ItemNotFound(i64),
    #[error("사용자를 찾을 수 없습니다: {0}")]
    UserNotFound(i64),
    #[error("설정 오류: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
