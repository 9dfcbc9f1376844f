use colored::Colorize;

use super::CommandOutcome;
use crate::session::SessionStats;

pub fn handle_command(input: &str) -> Result<CommandOutcome, String> {
    match input.to_lowercase().as_str() {
        "help" => {
            print_help();
            Ok(CommandOutcome::Continue)
        },
        "exit" | "quit" => {
            println!("👋 Goodbye!");
            Ok(CommandOutcome::Exit)
        },
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string())
    }
}

pub fn print_help() {
    println!("\n📚 PDF Chat Commands:");
    println!("  load <file.pdf> [...]  - Process one or more PDFs (replaces the current set)");
    println!("  files                  - List processed files");
    println!();

    println!("💬 Chat Commands:");
    println!("  ask <question>         - Ask about the processed documents");
    println!("  <question>             - Same as ask");
    println!("  clear                  - Clear the chat history");
    println!("  export [path]          - Save the chat history as JSON");
    println!();

    println!("⚙️ Settings:");
    println!("  set k <1-10>           - Number of retrieved passages");
    println!("  set chunk <500-2000>   - Chunk size in characters");
    println!("  set overlap <0-500>    - Chunk overlap in characters");
    println!("  set model <name>       - Gemini model");
    println!("  set key <api key>      - Gemini API key");
    println!("  stats                  - Show session analytics");
    println!();

    println!("🔧 System Commands:");
    println!("  help  - Show this help menu");
    println!("  exit  - Exit the program");
    println!();
}

pub fn print_stats(stats: &SessionStats) {
    let key_status = if stats.has_api_key {
        "✅ Set".green()
    } else {
        "❌ Missing".red()
    };

    println!("\n📊 Session Analytics:");
    println!("  Files Processed: {}", stats.files_processed.to_string().cyan());
    println!("  Chat Messages:   {}", stats.chat_messages.to_string().cyan());
    println!("  Model:           {}", stats.model.cyan());
    println!("  Chunk Size:      {}", stats.chunk_size.to_string().cyan());
    println!("  Chunk Overlap:   {}", stats.chunk_overlap.to_string().cyan());
    println!("  Results (k):     {}", stats.k_results.to_string().cyan());
    println!("  API Key:         {}", key_status);
    println!("  Started:         {}", stats.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().cyan());
    println!();
}
