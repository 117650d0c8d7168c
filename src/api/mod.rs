use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, Debug)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub session_id: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ChatResponse {
    pub response: String,
    pub agent_name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AgentInfo {
    pub name: String,
    pub endpoint: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct AgentDirectory {
    pub main_agent: AgentInfo,
    #[serde(default)]
    pub specialized_agents: Vec<AgentInfo>,
}

#[derive(Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

pub mod client;
