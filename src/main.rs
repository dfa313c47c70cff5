// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod availability;
mod backend;
mod cli;
mod command;
mod config;
mod error;
mod extra;
mod grid;
mod orchestrator;
mod prompt;
mod render;
mod replication;
mod session;
mod types;

use std::process::ExitCode;

use crate::cli::entrypoint;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    match entrypoint().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("weekplan: {e}");
            if e.is_retryable() {
                eprintln!("weekplan: the request failed and can be repeated.");
            }
            ExitCode::FAILURE
        }
    }
}
