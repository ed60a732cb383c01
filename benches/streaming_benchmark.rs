use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use excelbind::record::{FieldDescriptor, FieldType};
use excelbind::{ExcelReader, RecordWriter, RowSource};
use std::path::Path;
use tempfile::NamedTempFile;

fn fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("ID", FieldType::Int32),
        FieldDescriptor::new("Name", FieldType::Text),
        FieldDescriptor::new("Value", FieldType::Double),
        FieldDescriptor::new("Joined", FieldType::Date),
    ]
}

fn rows(size: usize) -> Vec<[String; 4]> {
    (0..size)
        .map(|i| {
            [
                i.to_string(),
                format!("Name_{}", i),
                (i as f64 * 1.5).to_string(),
                (40000 + i % 3000).to_string(),
            ]
        })
        .collect()
}

fn write_file(path: &Path, size: usize) {
    let mut writer = RecordWriter::create(path).unwrap();
    writer.write_batch(&fields(), rows(size), Some("Data")).unwrap();
    writer.close().unwrap();
}

fn benchmark_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    group.sample_size(10); // Reduce samples for large benchmarks

    for size in [100, 1000, 5000, 10000].iter() {
        let data = rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let temp = NamedTempFile::new().unwrap();
                let mut writer = RecordWriter::create(temp.path()).unwrap();
                writer.write_batch(&fields(), &data, Some("Data")).unwrap();
                writer.close().unwrap();
            });
        });
    }

    group.finish();
}

fn benchmark_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    group.sample_size(10);

    for size in [1000, 5000, 10000].iter() {
        // Prepare test file once
        let temp = NamedTempFile::new().unwrap();
        write_file(temp.path(), *size);

        group.bench_with_input(BenchmarkId::new("buffered", size), size, |b, _| {
            b.iter(|| {
                let mut reader = ExcelReader::open(temp.path()).unwrap();
                let mut source = reader.buffered(Some("Data")).unwrap();
                while source.read().unwrap() {
                    black_box(source.current_record().unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("streaming", size), size, |b, _| {
            b.iter(|| {
                let mut reader = ExcelReader::open(temp.path()).unwrap();
                let mut source = reader.streaming(Some("Data")).unwrap();
                while source.read().unwrap() {
                    black_box(source.current_record().unwrap());
                }
            });
        });
    }

    group.finish();
}

fn benchmark_many_batches(c: &mut Criterion) {
    c.bench_function("write_100_batches_of_10_rows", |b| {
        b.iter(|| {
            let temp = NamedTempFile::new().unwrap();
            let mut writer = RecordWriter::create(temp.path()).unwrap();
            let fields = fields();

            for batch in 0..100 {
                let data: Vec<[String; 4]> = rows(10)
                    .into_iter()
                    .map(|mut row| {
                        row[0] = (batch * 10).to_string();
                        row
                    })
                    .collect();
                writer.write_batch(&fields, data, None).unwrap();
            }

            writer.close().unwrap();
        });
    });
}

criterion_group!(benches, benchmark_write, benchmark_read, benchmark_many_batches);
criterion_main!(benches);
