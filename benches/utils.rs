use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use manga_scraper::SanitizedFilename;
use manga_scraper::chapter_number::ChapterNumber;

fn sanitize_filename(c: &mut Criterion) {
    let example = "Some manga: part 1/2?";

    c.bench_with_input(BenchmarkId::new("sanitized manga title", example), &example, |b, &ex| {
        b.iter(|| SanitizedFilename::new(ex));
    });
}

fn parse_chapter_number(c: &mut Criterion) {
    let mut group = c.benchmark_group("chapter number parsing");

    for example in [
        "chapter_3",
        "https://site.com/manga/some-title/chapter-139-5/",
        "Vol.4 Chapter 30: The Return",
        "https://site.com/manga/some-title/chapter-30-5-omake-1-2-extra/",
        "https://site.com/read/12345/129",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(example), &example, |b, &ex| {
            b.iter(|| ChapterNumber::parse(ex));
        });
    }

    group.finish();
}

criterion_group!(benches, sanitize_filename, parse_chapter_number);
criterion_main!(benches);
