use std::env;

use uuid::Uuid;

/// One (region, consumer) pair the server hosts a resident worker loop for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResidentWorker {
    pub region_id: Uuid,
    pub worker_id: String,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    /// Fallback intake region for `/trigger-pusher` calls without an
    /// explicit `regionId`.
    pub default_region_id: Option<Uuid>,
    /// Resident worker loops, from `WORKER_REGIONS=regionId:workerId,...`.
    pub resident_workers: Vec<ResidentWorker>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());

        let default_region_id = match env::var("DEFAULT_REGION_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Uuid::parse_str(raw.trim())
                    .map_err(|_| "DEFAULT_REGION_ID must be a valid UUID".to_string())?,
            ),
            _ => None,
        };

        let resident_workers = match env::var("WORKER_REGIONS") {
            Ok(raw) => parse_worker_regions(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(ServerConfig {
            listen_addr,
            database_url,
            jwt_secret,
            default_region_id,
            resident_workers,
        })
    }
}

fn parse_worker_regions(raw: &str) -> Result<Vec<ResidentWorker>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (region, worker) = pair
                .split_once(':')
                .ok_or_else(|| format!("WORKER_REGIONS entry '{pair}' must be regionId:workerId"))?;
            let region_id = Uuid::parse_str(region.trim())
                .map_err(|_| format!("WORKER_REGIONS entry '{pair}' has an invalid region id"))?;
            let worker_id = worker.trim();
            if worker_id.is_empty() {
                return Err(format!("WORKER_REGIONS entry '{pair}' is missing a worker id"));
            }
            Ok(ResidentWorker {
                region_id,
                worker_id: worker_id.to_string(),
            })
        })
        .collect()
}
