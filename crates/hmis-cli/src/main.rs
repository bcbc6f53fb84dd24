//! hmis-cli
//!
//! Command-line front end for the HMIS API. Responses are printed as JSON.

mod client;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use client::{ApiClient, NewAdmission, NewPatient};

#[derive(Parser)]
#[command(name = "hmis-cli", version, about = "Command-line client for the HMIS API")]
struct Cli {
    /// Base URL of the HMIS server
    #[arg(long, env = "HMIS_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Bearer token from `hmis-cli login`
    #[arg(long, env = "HMIS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and print a token to export as HMIS_TOKEN
    Login {
        username: String,
        #[arg(long, env = "HMIS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Search, show or register patients
    Patients {
        #[command(subcommand)]
        command: PatientCommand,
    },
    /// List beds
    Beds {
        /// Only free beds
        #[arg(long)]
        available: bool,
        #[arg(long)]
        ward_type: Option<String>,
    },
    /// Admit a patient; a bed is picked automatically unless --bed-id is given
    Admit {
        patient_id: i64,
        #[arg(long, value_enum, default_value_t = Category::General)]
        category: Category,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        bed_id: Option<i64>,
        #[arg(long)]
        ward_id: Option<i64>,
        #[arg(long)]
        doctor_id: Option<i64>,
    },
    /// Discharge an admission and free its bed
    Discharge {
        admission_id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Hospital-wide counters
    Dashboard,
}

#[derive(Subcommand)]
enum PatientCommand {
    List {
        /// Name or MRN fragment
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    Show {
        id: i64,
    },
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: String,
        #[arg(long, value_enum)]
        gender: Gender,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        blood_group: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    General,
    Icu,
}

impl Category {
    fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Icu => "icu",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

fn print(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server, cli.token).context("invalid --server")?;

    let output = match cli.command {
        Command::Login { username, password } => {
            let token = client.login(&username, &password).await?;
            println!("{}", token);
            return Ok(());
        }
        Command::Patients { command } => match command {
            PatientCommand::List { query, limit } => client.search_patients(query.as_deref(), limit).await?,
            PatientCommand::Show { id } => client.patient(id).await?,
            PatientCommand::Register {
                first_name,
                last_name,
                date_of_birth,
                gender,
                phone,
                blood_group,
            } => {
                client
                    .register_patient(&NewPatient {
                        first_name: &first_name,
                        last_name: &last_name,
                        date_of_birth: &date_of_birth,
                        gender: gender.as_str(),
                        phone: phone.as_deref(),
                        blood_group: blood_group.as_deref(),
                    })
                    .await?
            }
        },
        Command::Beds { available, ward_type } => client.beds(available, ward_type.as_deref()).await?,
        Command::Admit {
            patient_id,
            category,
            reason,
            bed_id,
            ward_id,
            doctor_id,
        } => {
            client
                .admit(&NewAdmission {
                    patient_id,
                    category: category.as_str(),
                    reason: &reason,
                    bed_id,
                    ward_id,
                    attending_doctor_id: doctor_id,
                })
                .await?
        }
        Command::Discharge { admission_id, notes } => client.discharge(admission_id, notes.as_deref()).await?,
        Command::Dashboard => client.dashboard().await?,
    };

    print(&output)
}
