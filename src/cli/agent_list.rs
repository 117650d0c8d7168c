//! `teller agents` — print the backend's agent directory.

use std::error::Error;

use crate::api::client::BankingClient;
use crate::api::AgentInfo;
use crate::core::routing;

pub async fn list_agents(client: &BankingClient) -> Result<(), Box<dyn Error>> {
    let directory = client.list_agents().await?;

    println!("Main agent:");
    print_agent(&directory.main_agent);

    if !directory.specialized_agents.is_empty() {
        println!();
        println!("Specialized agents:");
        for agent in &directory.specialized_agents {
            print_agent(agent);
        }
    }

    Ok(())
}

fn print_agent(agent: &AgentInfo) {
    let style = routing::resolve(Some(agent.name.as_str()));
    println!(
        "  {} {} ({})\n      {}",
        style.icon, style.label, agent.endpoint, agent.description
    );
}
