use std::{fs::File, marker::PhantomData, path::PathBuf, sync::Arc, time::SystemTime};

use futures::Stream;

use super::records::{Fields, FromCsvRecord};
use crate::pipeline::{Envelope, Origin, PipelineError, Source};

/// Delimited-file source for one warehouse table.
///
/// The first row is the header; columns are resolved by name. A record that
/// fails to decode is yielded as an error and reading carries on; failing to
/// open the file or a missing header column ends the stream.
pub struct CsvFileSource<T> {
    path: PathBuf,
    delimiter: u8,
    _row: PhantomData<fn() -> T>,
}

impl<T> CsvFileSource<T> {
    pub fn new<P: Into<PathBuf>>(path: P, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
            _row: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T: FromCsvRecord> Source<T> for CsvFileSource<T> {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>> {
        // Blocking reads inside the stream; files are read once per load.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let s = async_stream::stream! {
            let file_name: Arc<str> = path.display().to_string().into();
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open {file_name}: {e}")));
                    return;
                }
            };
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .trim(csv::Trim::Headers)
                .from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read headers of {file_name}: {e}")));
                    return;
                }
            };
            if let Some(missing) = T::COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
                yield Err(PipelineError::Source(format!("{file_name}: missing column '{missing}'")));
                return;
            }

            for result in rdr.records() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) if e.is_io_error() => {
                        yield Err(PipelineError::Source(format!("failed to read {file_name}: {e}")));
                        return;
                    }
                    Err(e) => {
                        let line = e.position().map(|p| p.line()).unwrap_or(0);
                        metrics::counter!("warehouse_rows_rejected_total", "stage" => "decode").increment(1);
                        yield Err(PipelineError::Decode {
                            origin: Origin { file: file_name.clone(), line },
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                let origin = Origin {
                    file: file_name.clone(),
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                };
                let decoded = T::from_csv_record(&Fields::new(&record, &headers));
                match decoded {
                    Ok(payload) => yield Ok(Envelope {
                        payload,
                        origin,
                        received_at: SystemTime::now(),
                    }),
                    Err(message) => {
                        metrics::counter!("warehouse_rows_rejected_total", "stage" => "decode").increment(1);
                        yield Err(PipelineError::Decode { origin, message });
                    }
                }
            }
        };

        Box::pin(s)
    }
}
