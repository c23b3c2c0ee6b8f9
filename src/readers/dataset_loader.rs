use crate::error::{DashboardError, Result};
use crate::models::{AirQualityDataset, Reading};
use crate::readers::AirQualityReader;
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Loads a dataset from a single CSV, a directory of per-station CSVs or a zip
/// archive of CSVs.
pub struct DatasetLoader {
    max_workers: usize,
    use_mmap: bool,
}

impl DatasetLoader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            use_mmap: false,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn load(&self, path: &Path) -> Result<AirQualityDataset> {
        info!("Loading air-quality data from {}", path.display());

        let readings = if path.is_dir() {
            self.load_directory(path)?
        } else if is_zip(path) {
            self.load_zip(path)?
        } else {
            AirQualityReader::with_mmap(self.use_mmap).read_csv(path)?
        };

        if readings.is_empty() {
            return Err(DashboardError::EmptyDataset(path.display().to_string()));
        }

        let dataset = AirQualityDataset::new(readings);
        info!(
            "Loaded {} readings from {} stations",
            dataset.len(),
            dataset.stations().len()
        );
        Ok(dataset)
    }

    /// Run the blocking load on the runtime's blocking pool
    pub async fn load_async(self, path: PathBuf) -> Result<AirQualityDataset> {
        tokio::task::spawn_blocking(move || self.load(&path)).await?
    }

    fn load_directory(&self, dir: &Path) -> Result<Vec<Reading>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_extension(p, "csv"))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(DashboardError::EmptyDataset(dir.display().to_string()));
        }
        debug!("Found {} CSV files in {}", files.len(), dir.display());

        let use_mmap = self.use_mmap;
        let per_file: Vec<Vec<Reading>> = self.pool()?.install(|| {
            files
                .par_iter()
                .map(|path| AirQualityReader::with_mmap(use_mmap).read_csv(path))
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(per_file.into_iter().flatten().collect())
    }

    fn load_zip(&self, zip_path: &Path) -> Result<Vec<Reading>> {
        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;

        // Entries are read sequentially, then parsed in parallel
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if entry.is_dir()
                || name.starts_with("__MACOSX/")
                || !has_extension(Path::new(&name), "csv")
            {
                debug!("Skipping archive entry {}", name);
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            if let Err(e) = entry.read_to_end(&mut bytes) {
                warn!("Could not read archive entry {}: {}", name, e);
                continue;
            }
            entries.push((name, bytes));
        }

        if entries.is_empty() {
            return Err(DashboardError::InvalidFormat(format!(
                "No CSV files found in archive {}",
                zip_path.display()
            )));
        }
        debug!("Found {} CSV entries in {}", entries.len(), zip_path.display());

        let per_entry: Vec<Vec<Reading>> = self.pool()?.install(|| {
            entries
                .par_iter()
                .map(|(name, bytes)| AirQualityReader::new().read_bytes(bytes, name))
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(per_entry.into_iter().flatten().collect())
    }

    fn pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| DashboardError::Config(e.to_string()))
    }
}

/// Load `path` on the blocking pool with `max_workers` parse threads
pub async fn load_dataset_async(path: PathBuf, max_workers: usize) -> Result<AirQualityDataset> {
    DatasetLoader::new(max_workers).load_async(path).await
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_zip(path: &Path) -> bool {
    has_extension(path, "zip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use zip::{CompressionMethod, ZipWriter};

    const DONGSI: &str = "\
No,year,month,day,hour,PM2.5,PM10,SO2,NO2,CO,O3,TEMP,PRES,DEWP,RAIN,wd,WSPM,station
1,2013,3,1,0,6,18,5,NA,800,88,0.1,1021.1,-18.6,0,NW,4.4,Dongsi
2,2013,3,1,1,6,15,5,NA,800,88,-0.3,1021.5,-19,0,NW,4,Dongsi
";

    const TIANTAN: &str = "\
No,year,month,day,hour,PM2.5,PM10,SO2,NO2,CO,O3,TEMP,PRES,DEWP,RAIN,wd,WSPM,station
1,2013,3,1,0,5,14,4,12,300,75,0.3,1021.0,-18.2,0,N,4.1,Tiantan
";

    #[test]
    fn test_load_directory() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("PRSA_Data_Dongsi.csv"), DONGSI)?;
        std::fs::write(dir.path().join("PRSA_Data_Tiantan.csv"), TIANTAN)?;
        std::fs::write(dir.path().join("README.txt"), "not data")?;

        let dataset = DatasetLoader::new(2).load(dir.path())?;
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.stations(), vec!["Dongsi", "Tiantan"]);
        Ok(())
    }

    #[test]
    fn test_load_zip_archive() -> Result<()> {
        let dir = TempDir::new()?;
        let zip_path = dir.path().join("PRSA2017_Data.zip");
        {
            let out = File::create(&zip_path)?;
            let mut zip = ZipWriter::new(out);
            let options =
                zip::write::FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.add_directory("PRSA_Data/", options)?;
            zip.start_file("PRSA_Data/PRSA_Data_Dongsi.csv", options)?;
            zip.write_all(DONGSI.as_bytes())?;
            zip.start_file("PRSA_Data/PRSA_Data_Tiantan.csv", options)?;
            zip.write_all(TIANTAN.as_bytes())?;
            zip.start_file("__MACOSX/PRSA_Data/._PRSA_Data_Dongsi.csv", options)?;
            zip.write_all(b"\x00\x05\x16\x07")?;
            zip.finish()?;
        }

        let dataset = DatasetLoader::new(2).load(&zip_path)?;

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.stations(), vec!["Dongsi", "Tiantan"]);
        Ok(())
    }

    #[test]
    fn test_empty_file_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "datetime,station,PM2.5")?;

        let result = DatasetLoader::new(1).load(file.path());
        assert!(matches!(result, Err(DashboardError::EmptyDataset(_))));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = DatasetLoader::new(1).load(Path::new("/nonexistent/data.csv"));
        assert!(matches!(result, Err(DashboardError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_async() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(TIANTAN.as_bytes())?;

        let dataset = DatasetLoader::new(1)
            .load_async(file.path().to_path_buf())
            .await?;
        assert_eq!(dataset.stations(), vec!["Tiantan"]);
        Ok(())
    }
}
