use rask_otlp_gateway::error::GatewayError;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    rask_otlp_gateway::app::run().await
}
