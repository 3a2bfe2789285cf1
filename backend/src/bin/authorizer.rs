use lambda_runtime::{run, service_fn, Error, LambdaEvent};

use backend::{
    authorizer::{authorize, AuthorizerRequest, AuthorizerResponse},
    logging::init_tracing,
    server,
    types::Environment,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let environment = Environment::from_env();
    init_tracing(&environment);

    let verifier = server::jwt_verifier(&environment)?;
    let verifier = &verifier;

    run(service_fn(move |event: LambdaEvent<AuthorizerRequest>| async move {
        Ok::<AuthorizerResponse, Error>(authorize(verifier, &event.payload).await)
    }))
    .await
}
