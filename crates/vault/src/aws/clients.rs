//! AWS SDK client initialisation.

use aws_config::BehaviorVersion;

/// Build a DynamoDB client from the standard AWS configuration chain.
///
/// Credentials and region come from the usual environment / profile / IMDS
/// providers. `endpoint_url` overrides the service endpoint, e.g.
/// `http://localhost:8000` for DynamoDB Local.
pub async fn dynamodb_client(endpoint_url: Option<&str>) -> aws_sdk_dynamodb::Client {
    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let mut builder = aws_sdk_dynamodb::config::Builder::from(&config);
    if let Some(endpoint) = endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }

    aws_sdk_dynamodb::Client::from_conf(builder.build())
}
