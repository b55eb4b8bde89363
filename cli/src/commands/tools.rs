//! Tools listing command

use anyhow::Result;
use rlm_core::tools::ToolRegistry;
use tracing::info;

/// Show the operations the outer agent declares
pub async fn tools_command() -> Result<()> {
    info!("Listing available tools");

    println!("🛠️  Available Tools\n");

    let registry = ToolRegistry::default();
    for name in registry.list_tools() {
        if let Some((tool_name, description)) = registry.get_tool_info(name) {
            println!("📦 {}", tool_name);
            println!("   {}\n", description);
        }
    }

    println!("💡 Tasks over large data are best handed to call_sub_rlm.");

    Ok(())
}
