//! Canned `stats_noreset` responses of a two-thread resolver.
//!
//! Counters are derived from `queries` so consecutive calls with growing
//! values look like a live service; totals always equal the per-thread sum.

fn scoped(scope: &str, queries: u64, out: &mut Vec<String>) {
    let hits = queries * 3 / 4;
    let miss = queries - hits;
    out.extend([
        format!("{scope}.num.queries={queries}"),
        format!("{scope}.num.queries_ip_ratelimited=0"),
        format!("{scope}.num.cachehits={hits}"),
        format!("{scope}.num.cachemiss={miss}"),
        format!("{scope}.num.prefetch=0"),
        format!("{scope}.num.expired=0"),
        format!("{scope}.num.recursivereplies={miss}"),
        format!("{scope}.requestlist.avg=0.5"),
        format!("{scope}.requestlist.max=3"),
        format!("{scope}.requestlist.overwritten=0"),
        format!("{scope}.requestlist.exceeded=0"),
        format!("{scope}.requestlist.current.all=0"),
        format!("{scope}.requestlist.current.user=0"),
        format!("{scope}.recursion.time.avg=0.013874"),
        format!("{scope}.recursion.time.median=0.00848"),
        format!("{scope}.tcpusage=0"),
    ]);
}

/// Default statistics: per-thread and total counters plus timing.
pub fn basic_stats_response(queries: u64) -> Vec<String> {
    let t1 = queries / 2;
    let t0 = queries - t1;

    let mut out = Vec::new();
    scoped("thread0", t0, &mut out);
    scoped("thread1", t1, &mut out);
    // Per-thread hits are rounded separately, so totals are summed rather
    // than recomputed.
    let total_hits = t0 * 3 / 4 + t1 * 3 / 4;
    let total_miss = queries - total_hits;
    out.extend([
        format!("total.num.queries={queries}"),
        "total.num.queries_ip_ratelimited=0".to_string(),
        format!("total.num.cachehits={total_hits}"),
        format!("total.num.cachemiss={total_miss}"),
        "total.num.prefetch=0".to_string(),
        "total.num.expired=0".to_string(),
        format!("total.num.recursivereplies={total_miss}"),
        "total.requestlist.avg=0.5".to_string(),
        "total.requestlist.max=3".to_string(),
        "total.requestlist.overwritten=0".to_string(),
        "total.requestlist.exceeded=0".to_string(),
        "total.requestlist.current.all=0".to_string(),
        "total.requestlist.current.user=0".to_string(),
        "total.recursion.time.avg=0.013874".to_string(),
        "total.recursion.time.median=0.00848".to_string(),
        "total.tcpusage=0".to_string(),
        "time.now=1574094836.941149".to_string(),
        "time.up=88.434983".to_string(),
        "time.elapsed=88.434983".to_string(),
    ]);
    out
}

/// Basic statistics followed by the `extended-statistics: yes` groups.
pub fn extended_stats_response(queries: u64) -> Vec<String> {
    let mut out = basic_stats_response(queries);
    let aaaa = queries / 4;
    let a = queries - aaaa;
    out.extend([
        "mem.cache.rrset=178642".to_string(),
        "mem.cache.message=90357".to_string(),
        "mem.mod.iterator=16588".to_string(),
        "mem.mod.validator=81059".to_string(),
        "mem.mod.respip=0".to_string(),
        "mem.streamwait=0".to_string(),
        format!("num.query.type.A={a}"),
        format!("num.query.type.AAAA={aaaa}"),
        format!("num.query.class.IN={queries}"),
        format!("num.query.opcode.QUERY={queries}"),
        "num.query.tcp=0".to_string(),
        "num.query.tcpout=0".to_string(),
        "num.query.ipv6=0".to_string(),
        format!("num.query.flags.RD={queries}"),
        format!("num.answer.rcode.NOERROR={a}"),
        format!("num.answer.rcode.NXDOMAIN={aaaa}"),
        "num.rrset.bogus=0".to_string(),
        "unwanted.queries=0".to_string(),
        "unwanted.replies=0".to_string(),
        "msg.cache.count=94".to_string(),
        "rrset.cache.count=304".to_string(),
        "infra.cache.count=5".to_string(),
        "key.cache.count=4".to_string(),
    ]);
    out
}
