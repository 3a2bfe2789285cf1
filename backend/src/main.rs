use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;

use backend::{
    attachment_storage::AttachmentStorage, logging::init_tracing, server, types::Environment,
};
use todo_storage::{TodoRepository, TodoStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();
    init_tracing(&environment);

    let dynamodb_client = Arc::new(DynamoDbClient::new(&environment.aws_config().await));
    let todo_repository: Arc<dyn TodoRepository> = Arc::new(TodoStorage::new(
        dynamodb_client,
        environment.todos_table(),
        environment.todos_by_user_index(),
    ));

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let attachment_storage = Arc::new(AttachmentStorage::new(
        s3_client,
        environment.attachments_bucket(),
        environment.signed_url_expiry_secs(),
    ));

    let jwt_verifier = Arc::new(server::jwt_verifier(&environment)?);

    server::start(
        environment,
        todo_repository,
        attachment_storage,
        jwt_verifier,
    )
    .await
}
